use axum::response::Html;

pub async fn index() -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Mesos Exporter</title></head>\n<body>\n<h1>Mesos Exporter</h1>\n<p>{} {}</p>\n<p><a href=\"/metrics\">Metrics</a></p>\n</body>\n</html>\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    ))
}
