pub async fn home() -> &'static str {
    "Vercord"
}
