use benchmark_api::messaging::{
    JobMessage, LogPublisher, LogSink, PgmqLogSink, RequestLogEntry, SinkMessage,
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_pgmq_sink_round_trip(pool: PgPool) {
    let sink = PgmqLogSink::connect(pool, "test_logs").await.unwrap();
    let task_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    sink.publish(&SinkMessage::Job(JobMessage::task_queued(task_id, user_id)))
        .await
        .unwrap();

    let messages = sink
        .client()
        .read_messages(sink.queue_name(), Some(30), 10)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    let body = &messages[0].message;
    assert_eq!(body["kind"], "task_queued");
    assert_eq!(body["task_id"], task_id.to_string());
    assert_eq!(body["user_id"], user_id.to_string());
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_publisher_drains_into_pgmq(pool: PgPool) {
    let sink = PgmqLogSink::connect(pool, "drain_logs").await.unwrap();
    let (publisher, drain) = LogPublisher::spawn(Arc::new(sink.clone()), 8);

    assert!(publisher.request_log(RequestLogEntry {
        method: "GET".to_string(),
        url: "http://bench.local/".to_string(),
        status_code: 200,
        process_time_ms: 1.5,
        client_ip: Some("127.0.0.1".to_string()),
    }));

    // Dropping the last sender ends the drain loop after it flushes
    drop(publisher);
    drain.await.unwrap();

    let messages = sink
        .client()
        .read_messages("drain_logs", Some(30), 10)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].message["status_code"], 200);
    assert_eq!(messages[0].message["client_ip"], "127.0.0.1");
}
