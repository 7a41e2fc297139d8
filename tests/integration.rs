use std::io::Write;
use std::process::{Command, Stdio};

const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_codestep"));
    // Keep tests independent of any user configuration.
    cmd.env("HOME", std::env::temp_dir());
    cmd
}

fn run_with_stdin(args: &[&str], stdin: &str) -> std::process::Output {
    let mut child = cargo_bin()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().expect("failed to wait")
}

fn write_request(dir: &tempfile::TempDir, name: &str, body: &serde_json::Value) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, body.to_string()).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn doctor_returns_json() {
    let output = cargo_bin().arg("doctor").output().expect("failed to run");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("invalid JSON");
    assert_eq!(json["version"], PKG_VERSION);
    let types: Vec<&str> = json["change_types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        ["replace", "append", "insert", "insert_after", "insert_before"]
    );
}

#[test]
fn apply_from_request_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write_request(
        &dir,
        "step1.json",
        &serde_json::json!({
            "files": {
                "src/main.py": { "content": "def main():\n    pass\n", "purpose": "entry point" }
            },
            "changes": [
                { "file": "src/main.py", "change_type": "insert_after", "insert_after": "def main", "content": "    print('hi')" },
                { "file": "README.md", "change_type": "append", "content": "# Demo" }
            ]
        }),
    );

    let output = cargo_bin()
        .args(["apply", "--path", &path])
        .output()
        .expect("failed to run");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("invalid JSON");
    assert_eq!(
        json["files"]["src/main.py"]["content"],
        "def main():\n    print('hi')\n    pass\n"
    );
    assert_eq!(json["files"]["src/main.py"]["purpose"], "entry point");
    assert_eq!(json["files"]["README.md"]["content"], "# Demo");
    assert_eq!(json["first_created"], "README.md");
    assert_eq!(json["metadata"]["src/main.py"]["calculated_line_number"], 2);
    assert_eq!(json["changes"][0]["highlight"]["start"], 1);
    assert_eq!(json["changes"][0]["highlight"]["end"], 2);
    assert_eq!(json["changes"][1]["stats"]["added"], 1);
    assert!(json["changes"][0]["hash"].as_str().unwrap().len() == 64);

    // File order follows insertion order
    let keys: Vec<&String> = json["files"].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["src/main.py", "README.md"]);
}

#[test]
fn apply_from_stdin_reports_unsupported_type() {
    let request = serde_json::json!({
        "files": { "a.txt": "a" },
        "changes": [
            { "file": "a.txt", "change_type": "delete" },
            { "file": "a.txt", "change_type": "append", "content": "b" }
        ]
    });
    let output = run_with_stdin(&["apply"], &request.to_string());
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("invalid JSON");
    assert_eq!(json["files"]["a.txt"]["content"], "a\nb");
    assert_eq!(json["rejected"][0]["index"], 0);
    assert_eq!(json["rejected"][0]["error"]["code"], "UNSUPPORTED_CHANGE_TYPE");
}

#[test]
fn apply_batch_ndjson_keeps_input_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let first = write_request(
        &dir,
        "one.json",
        &serde_json::json!({ "files": {}, "changes": [
            { "file": "one.txt", "change_type": "replace", "content": "1" }
        ]}),
    );
    let second = write_request(
        &dir,
        "two.json",
        &serde_json::json!({ "files": {}, "changes": [
            { "file": "two.txt", "change_type": "replace", "content": "2" }
        ]}),
    );
    let missing = dir.path().join("missing.json");
    let paths = format!("{first},{},{second}", missing.display());

    let output = cargo_bin()
        .args(["apply", "--paths", &paths])
        .output()
        .expect("failed to run");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .trim()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["first_created"], "one.txt");
    assert_eq!(lines[1]["error"]["code"], "FILE_NOT_FOUND");
    assert_eq!(lines[2]["first_created"], "two.txt");
}

#[test]
fn apply_file_not_found() {
    let output = cargo_bin()
        .args(["apply", "--path", "nonexistent.json"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("error should be JSON");
    assert_eq!(json["error"]["code"], "FILE_NOT_FOUND");
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("nonexistent.json")
    );
}

#[test]
fn apply_invalid_json_is_invalid_request() {
    let output = run_with_stdin(&["apply"], "{ not json");
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"]["code"], "INVALID_REQUEST");
}

#[test]
fn highlight_and_stats_commands() {
    let request = serde_json::json!({
        "content": "a\nb\nc\nd",
        "metadata": {
            "change_type": "append",
            "original_content": "a\nb",
            "content": "c\nd"
        }
    });

    let output = run_with_stdin(&["highlight"], &request.to_string());
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["highlight"]["start"], 2);
    assert_eq!(json["highlight"]["end"], 4);

    let output = run_with_stdin(&["stats"], &request.to_string());
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["added"], 4);
    assert_eq!(json["removed"], 0);
}

#[test]
fn decode_double_encoded_body() {
    let body = serde_json::to_string(r#"{"changes":[]}"#).unwrap();
    let output = cargo_bin()
        .args(["decode", "--body", &body])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"], "success");
    assert!(json["data"]["changes"].is_array());
}

#[test]
fn decode_error_body() {
    let output = cargo_bin()
        .args(["decode", "--status", "503", "--body", "upstream down"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"], "failure");
    assert_eq!(json["status"], 503);
    assert_eq!(json["error"], "Unknown error");
    assert_eq!(json["message"], "upstream down");
}

#[test]
fn apply_with_reply_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let request = write_request(
        &dir,
        "files.json",
        &serde_json::json!({ "files": { "main.py": "print(1)" } }),
    );
    let inner = serde_json::json!({ "changes": [
        { "file": "main.py", "change_type": "insert", "line_number": 1, "content": "import os" }
    ]});
    let reply = dir.path().join("reply.json");
    std::fs::write(&reply, serde_json::to_string(&inner.to_string()).unwrap()).unwrap();

    let output = cargo_bin()
        .args(["apply", "--path", &request, "--reply-file", reply.to_str().unwrap()])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["files"]["main.py"]["content"], "import os\nprint(1)");

    std::fs::write(&reply, r#"{"error":"Rate limited"}"#).unwrap();
    let output = cargo_bin()
        .args([
            "apply",
            "--path",
            &request,
            "--reply-file",
            reply.to_str().unwrap(),
            "--status",
            "429",
        ])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"]["code"], "BACKEND_ERROR");
    assert!(json["error"]["message"].as_str().unwrap().contains("Rate limited"));
}

#[test]
fn session_ndjson() {
    let input = [
        r#"{"command":"apply","files":{"f.txt":"x\ny\n"},"changes":[{"file":"f.txt","change_type":"insert_after","insert_after":"x","content":"MARK\nz"},{"file":"f.txt","change_type":"insert_after","insert_after":"MARK","content":"w"}]}"#,
        r#"{"command":"doctor"}"#,
        r#"{"command":"highlight"}"#,
        r#"{"command":"apply","files":{"a.txt":"a"},"status":200,"body":"{\"changes\":[{\"file\":\"a.txt\",\"change_type\":\"append\",\"content\":\"b\"}]}"}"#,
    ]
    .join("\n");
    let output = run_with_stdin(&["session"], &input);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.trim().lines().collect();
    assert_eq!(lines.len(), 4, "Should have 4 NDJSON lines");

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["files"]["f.txt"]["content"], "x\nMARK\nw\nz\ny\n");

    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["version"], PKG_VERSION);

    let third: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
    assert_eq!(third["error"]["code"], "INVALID_REQUEST");

    let fourth: serde_json::Value = serde_json::from_str(lines[3]).unwrap();
    assert_eq!(fourth["files"]["a.txt"]["content"], "a\nb");
}

#[test]
fn mcp_lists_tools() {
    use std::io::{BufRead, BufReader};

    let mut child = cargo_bin()
        .arg("mcp")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn mcp");

    let mut stdin = child.stdin.take().unwrap();
    let mut responses = BufReader::new(child.stdout.take().unwrap()).lines();
    let mut next_response = || -> serde_json::Value {
        let line = responses
            .next()
            .expect("server closed stdout")
            .expect("failed to read stdout");
        serde_json::from_str(&line).expect("should be valid JSON-RPC")
    };

    writeln!(
        stdin,
        r#"{{"jsonrpc":"2.0","id":1,"method":"initialize","params":{{"protocolVersion":"2024-11-05","capabilities":{{}},"clientInfo":{{"name":"test","version":"1.0"}}}}}}"#
    )
    .unwrap();
    let init = next_response();
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["serverInfo"]["name"], "codestep");
    assert_eq!(init["result"]["serverInfo"]["version"], PKG_VERSION);
    assert!(init["result"]["capabilities"]["tools"].is_object());

    writeln!(stdin, r#"{{"jsonrpc":"2.0","method":"notifications/initialized"}}"#).unwrap();
    writeln!(stdin, r#"{{"jsonrpc":"2.0","id":2,"method":"tools/list"}}"#).unwrap();
    let list = loop {
        let response = next_response();
        if response["id"] == 2 {
            break response;
        }
    };

    // Close stdin to terminate the server
    drop(stdin);
    let _ = child.wait();

    let mut names: Vec<&str> = list["result"]["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    names.sort_unstable();
    assert_eq!(
        names,
        ["apply_changes", "decode_response", "diff_stats", "doctor", "highlight_range"]
    );
}

#[test]
fn init_writes_config() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    let output = cargo_bin()
        .args(["init", "--path", config_path.to_str().unwrap()])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("max_input_size"));
    assert!(content.contains("[log]"));

    // A second init refuses to clobber the file unless forced
    let output = cargo_bin()
        .args(["init", "--path", config_path.to_str().unwrap()])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"]["code"], "INVALID_REQUEST");

    let output = cargo_bin()
        .args(["init", "--force", "--path", config_path.to_str().unwrap()])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
}

#[test]
fn config_input_limit_applies() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "max_input_size = 4\n").unwrap();

    let request = serde_json::json!({ "files": { "a": "0123456789" }, "changes": [] });
    let output = run_with_stdin(
        &["--config", config_path.to_str().unwrap(), "apply"],
        &request.to_string(),
    );
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"]["code"], "INVALID_REQUEST");
}

#[test]
fn debug_run_writes_log_under_configured_prefix() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[log]\ndir = \"trace\"\nprefix = \"steps\"\n").unwrap();

    let output = cargo_bin()
        .args(["--debug", "--config", config_path.to_str().unwrap(), "doctor"])
        .env_remove("CODESTEP_LOG")
        .output()
        .expect("failed to run");
    assert!(output.status.success());

    let logs: Vec<String> = std::fs::read_dir(dir.path().join("trace"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        logs.iter().any(|name| name.starts_with("steps")),
        "log files: {logs:?}"
    );
}
