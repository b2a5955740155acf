macro_rules! register_collectors {
    (
        $(
            $module:ident => $collector_type:ident
        ),* $(,)?
    ) => {
        // Import all collector modules
        $(
            pub mod $module;
            pub use $module::$collector_type;
        )*

        // Generate the enum with all collector types
        #[derive(Clone)]
        pub enum CollectorType {
            $(
                $collector_type($collector_type),
            )*
        }

        // Implement Collector trait for CollectorType enum
        impl Collector for CollectorType {
            fn name(&self) -> &'static str {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.name(),
                    )*
                }
            }

            fn enabled_by_default(&self) -> bool {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.enabled_by_default(),
                    )*
                }
            }

            fn supports(&self, role: Role) -> bool {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.supports(role),
                    )*
                }
            }

            fn describe(&self) -> Vec<MetricDesc> {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.describe(),
                    )*
                }
            }

            async fn collect(&self) -> Vec<Sample> {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.collect().await,
                    )*
                }
            }
        }

        // Generate the factory function map
        pub fn all_factories() -> HashMap<&'static str, fn(&CollectorContext) -> CollectorType> {
            let mut map: HashMap<&'static str, fn(&CollectorContext) -> CollectorType> =
                HashMap::new();
            $(
                map.insert(
                    stringify!($module),
                    |ctx| CollectorType::$collector_type($collector_type::new(ctx)),
                );
            )*
            map
        }

        // Default state by name, without building a collector (no client needed)
        pub fn default_enabled(name: &str) -> bool {
            match name {
                $(
                    stringify!($module) => $collector_type::ENABLED_BY_DEFAULT,
                )*
                _ => false,
            }
        }

        // Collector names in registration order, used for the CLI flags
        pub const COLLECTOR_NAMES: &[&'static str] = &[
            $(stringify!($module),)*
        ];
    };
}
