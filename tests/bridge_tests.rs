//! Bridge 集成测试（通过内存管道驱动 stdio 协议）

#[cfg(feature = "server")]
mod tests {
    use lazygit_mcp_bridge::{Bridge, BridgeConfig, IngestOutcome};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
    use tokio::task::JoinHandle;

    /// 测试用的客户端一侧
    struct TestClient {
        writer: DuplexStream,
        lines: Lines<BufReader<DuplexStream>>,
    }

    impl TestClient {
        async fn send(&mut self, request: Value) {
            self.send_raw(&request.to_string()).await;
        }

        async fn send_raw(&mut self, line: &str) {
            self.writer
                .write_all(format!("{}\n", line).as_bytes())
                .await
                .unwrap();
        }

        async fn recv(&mut self) -> Value {
            let line = self.lines.next_line().await.unwrap().expect("server closed output");
            serde_json::from_str(&line).unwrap()
        }

        async fn call(&mut self, request: Value) -> Value {
            self.send(request).await;
            self.recv().await
        }
    }

    /// 启动 Bridge，返回客户端和 Server 任务
    fn start() -> (Arc<Bridge>, TestClient, JoinHandle<()>, TempDir) {
        let tmp = tempdir().unwrap();
        let config = BridgeConfig::new(tmp.path().join("mcp-messages.json"), "/repo");
        let bridge = Arc::new(Bridge::new(config));

        let (client_in, server_in) = duplex(64 * 1024);
        let (server_out, client_out) = duplex(64 * 1024);

        let handle = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge.serve(BufReader::new(server_in), server_out).await.unwrap();
            })
        };

        let client = TestClient {
            writer: client_in,
            lines: BufReader::new(client_out).lines(),
        };
        (bridge, client, handle, tmp)
    }

    fn message(comment: &str, project_root: &str, time: &str) -> String {
        json!({
            "file": "a.go",
            "comment": comment,
            "project_root": project_root,
            "time": time,
        })
        .to_string()
    }

    fn read_request(id: u64) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": "resources/read", "params": {"uri": "lazygit://messages"}})
    }

    fn tool_request(id: u64) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": "tools/call", "params": {"name": "check_lazygit_messages", "arguments": {}}})
    }

    #[tokio::test]
    async fn test_initialize_handshake() {
        let (_bridge, mut client, _handle, _tmp) = start();

        let resp = client
            .call(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2024-11-05"}}))
            .await;
        assert_eq!(resp["jsonrpc"], "2.0");
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(resp["result"]["capabilities"]["resources"]["subscribe"], true);

        // initialized 没有响应，下一行应是 tools/list 的响应
        client
            .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        let resp = client
            .call(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
            .await;
        assert_eq!(resp["id"], 2);
        assert_eq!(resp["result"]["tools"][0]["name"], "check_lazygit_messages");
    }

    #[tokio::test]
    async fn test_parse_error_keeps_serving() {
        let (_bridge, mut client, _handle, _tmp) = start();

        client.send_raw("not json").await;
        let resp = client.recv().await;
        assert_eq!(resp["jsonrpc"], "2.0");
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["error"]["code"], -32700);

        client
            .send_raw(r#"["2.0", 1, "resources/read", {"uri": "lazygit://messages"}]"#)
            .await;
        let resp = client.recv().await;
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["error"]["code"], -32700);

        let resp = client
            .call(json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"}))
            .await;
        assert_eq!(resp["result"]["resources"][0]["uri"], "lazygit://messages");
    }

    #[tokio::test]
    async fn test_tools_call_returns_ingested_message() {
        let (bridge, mut client, _handle, _tmp) = start();

        let outcome = bridge
            .inbox()
            .ingest_str(&message("fix nil check", "/repo", "2024-01-01T00:00:00Z"))
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Queued { queue_len: 1 });

        let resp = client.call(tool_request(1)).await;
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Message 1:\nFile: a.go\nComment: fix nil check\nTime: 2024-01-01T00:00:00Z"));
        assert_eq!(resp["result"]["content"][0]["type"], "text");

        // 队列已清空
        let resp = client.call(read_request(2)).await;
        assert_eq!(resp["result"]["contents"][0]["text"], "No new messages from lazygit");
    }

    #[tokio::test]
    async fn test_foreign_project_never_served() {
        let (bridge, mut client, _handle, _tmp) = start();

        bridge
            .inbox()
            .ingest_str(&message("secret", "/elsewhere", "2024-01-01T00:00:00Z"))
            .unwrap();

        let resp = client.call(read_request(1)).await;
        let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
        assert!(!text.contains("secret"));
        assert_eq!(text, "No new messages from lazygit");
    }

    #[tokio::test]
    async fn test_eviction_and_order_over_protocol() {
        let (bridge, mut client, _handle, _tmp) = start();

        for n in 1..=11 {
            bridge
                .inbox()
                .ingest_str(&message(&format!("comment {}", n), "/repo", &format!("t{}", n)))
                .unwrap();
        }

        let resp = client.call(read_request(1)).await;
        let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
        assert!(!text.contains("Comment: comment 1\n"));
        assert!(text.starts_with("Message 1:\nFile: a.go\nComment: comment 2\n"));
        assert!(text.contains("Message 10:\nFile: a.go\nComment: comment 11\n"));
        assert!(!text.contains("Message 11:"));
    }

    #[tokio::test]
    async fn test_subscribe_unknown_uri_is_invalid_params() {
        let (_bridge, mut client, _handle, _tmp) = start();

        let resp = client
            .call(json!({"jsonrpc": "2.0", "id": 9, "method": "resources/subscribe", "params": {"uri": "lazygit://unknown"}}))
            .await;
        assert_eq!(resp["id"], 9);
        assert_eq!(resp["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_notifications_follow_subscription() {
        let (bridge, mut client, _handle, _tmp) = start();

        // 未订阅：只有日志通知
        let resp = client.call(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        assert_eq!(resp["id"], 1);
        bridge
            .inbox()
            .ingest_str(&message("first", "/repo", "t1"))
            .unwrap();
        let note = client.recv().await;
        assert_eq!(note["method"], "notifications/message");
        assert_eq!(note["params"]["message"], "New message from lazygit: first");
        assert!(note.get("id").is_none());

        // 订阅后：先资源更新，再日志
        let resp = client
            .call(json!({"jsonrpc": "2.0", "id": 2, "method": "resources/subscribe", "params": {"uri": "lazygit://messages"}}))
            .await;
        assert_eq!(resp["result"], json!({}));
        assert!(bridge.notifier().has_subscribers());

        bridge
            .inbox()
            .ingest_str(&message("second", "/repo", "t2"))
            .unwrap();
        let update = client.recv().await;
        assert_eq!(update["method"], "notifications/resources/updated");
        assert_eq!(update["params"]["uri"], "lazygit://messages");
        let log = client.recv().await;
        assert_eq!(log["method"], "notifications/message");

        // 重复消息不再通知，下一行是 tools/call 的响应
        assert_eq!(
            bridge.inbox().ingest_str(&message("second", "/repo", "t2")).unwrap(),
            IngestOutcome::Duplicate
        );
        let resp = client.call(tool_request(3)).await;
        assert_eq!(resp["id"], 3);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Comment: first"));
        assert!(text.contains("Comment: second"));
    }

    #[tokio::test]
    async fn test_drain_removes_message_file() {
        let (bridge, mut client, _handle, _tmp) = start();
        let file = bridge.config().message_file.clone();

        std::fs::write(&file, message("from disk", "/repo", "t1")).unwrap();
        bridge.inbox().ingest_file().unwrap();
        assert!(file.exists());

        let resp = client.call(read_request(1)).await;
        assert!(resp["result"]["contents"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Comment: from disk"));
        assert!(!file.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tool_call_absorbs_unseen_file_and_announces_it() {
        let (bridge, mut client, _handle, _tmp) = start();
        let file = bridge.config().message_file.clone();

        let resp = client
            .call(json!({"jsonrpc": "2.0", "id": 1, "method": "resources/subscribe", "params": {"uri": "lazygit://messages"}}))
            .await;
        assert_eq!(resp["result"], json!({}));

        // 文件事件尚未处理
        std::fs::write(&file, message("unseen", "/repo", "t1")).unwrap();
        client.send(tool_request(2)).await;

        let updated = client.recv().await;
        assert_eq!(updated["method"], "notifications/resources/updated");
        let log = client.recv().await;
        assert_eq!(log["params"]["message"], "New message from lazygit: unseen");

        let resp = client.recv().await;
        assert_eq!(resp["id"], 2);
        assert!(resp["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Comment: unseen"));
        assert!(!file.exists());
        assert!(bridge.inbox().is_empty());
    }

    #[tokio::test]
    async fn test_serve_returns_when_input_closes() {
        let (_bridge, client, handle, _tmp) = start();

        drop(client);
        handle.await.unwrap();
    }
}
