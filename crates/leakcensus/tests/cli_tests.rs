#[cfg(test)]
pub mod tests {
    use std::process::{Command, Output};

    fn run_example(package: &str, example: &str, envs: &[(&str, &str)]) -> Output {
        let output = Command::new("cargo")
            .args([
                "run",
                "-p",
                package,
                "--example",
                example,
                "--features",
                "leakcensus-alloc",
            ])
            .env_remove("LEAKCENSUS_FORMAT")
            .envs(envs.iter().copied())
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to execute command");

        assert!(
            output.status.success(),
            "Process did not exit successfully: {output:?}",
        );
        output
    }

    fn run_cli(args: &[&str]) -> Output {
        Command::new("cargo")
            .args(["run", "-p", "leakcensus", "--bin", "leakcensus", "--"])
            .args(args)
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to execute command")
    }

    // cargo's own progress lines share stderr with the report
    fn report_section(stderr: &str) -> &str {
        stderr
            .find("============")
            .map_or("", |start| &stderr[start..])
    }

    #[test]
    fn test_basic_output() {
        let output = run_example("leakcensus", "basic", &[]);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let report = report_section(&stderr);

        let expected = [
            "============\nMEMORY LEAKS\n",
            "examples/basic.rs\n",
            "    3 leaks at line 2\n",
            "    1 leak at line 16\n",
            "    1 leak at line 27\n",
        ];
        for expected in expected {
            assert!(
                report.contains(expected),
                "Output did not match expected.\nExpected:\n{expected}\n\nGot:\n{stderr}",
            );
        }

        // balanced() frees everything it allocates
        assert!(!report.contains("at line 9\n"), "Got:\n{stderr}");
        assert_eq!(report.matches("MEMORY LEAKS").count(), 1);

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("freed before the report"));
    }

    #[test]
    fn test_clean_run_prints_nothing() {
        let output = run_example("leakcensus", "clean", &[]);
        let stderr = String::from_utf8_lossy(&output.stderr);

        assert!(
            !stderr.contains("MEMORY LEAKS"),
            "Expected no report.\n\nGot:\n{stderr}",
        );
        assert!(output.stdout.is_empty());
    }

    #[test]
    fn test_main_format_json() {
        let output = run_example("leakcensus", "main_format", &[]);
        let stdout = String::from_utf8_lossy(&output.stdout);

        let json: serde_json::Value =
            serde_json::from_str(&stdout).expect("Failed to parse JSON output");
        assert_eq!(json["caller_name"], "main_format::main");
        assert_eq!(json["total_leaks"], 3);
        assert_eq!(json["files"].as_array().map(Vec::len), Some(1));

        let sites = json["files"][0]["sites"].as_array().unwrap();
        assert_eq!(sites[0]["line"], 2);
        assert_eq!(sites[0]["count"], 2);
        assert_eq!(sites[1]["line"], 9);
        assert_eq!(sites[1]["count"], 1);
    }

    #[test]
    fn test_format_env_override() {
        let output = run_example(
            "leakcensus",
            "main_format",
            &[("LEAKCENSUS_FORMAT", "text")],
        );
        let stderr = String::from_utf8_lossy(&output.stderr);
        let report = report_section(&stderr);

        assert!(report.contains("    2 leaks at line 2\n"), "Got:\n{stderr}");
        assert!(report.contains("    1 leak at line 9\n"), "Got:\n{stderr}");
        assert!(output.stdout.is_empty());
    }

    #[test]
    fn test_custom_guard_output() {
        let output = run_example("leakcensus", "custom_guard", &[]);
        let stdout = String::from_utf8_lossy(&output.stdout);

        // report_now followed by finish
        assert_eq!(stdout.matches("census: custom_guard").count(), 2);
        assert!(stdout.contains("total leaks: 4"), "Got:\n{stdout}");
        assert!(stdout.contains("total leaks: 2"), "Got:\n{stdout}");
        assert!(stdout.contains("examples/custom_guard.rs:18 2"), "Got:\n{stdout}");
    }

    #[test]
    fn test_threaded_table_output() {
        let output = run_example("leakcensus", "threaded", &[]);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let expected = [
            "[leakcensus] threaded::main: 4 leaks at 1 site",
            "File",
            "Leaks",
            "examples/threaded.rs",
        ];
        for expected in expected {
            assert!(
                stderr.contains(expected),
                "Output did not match expected.\nExpected:\n{expected}\n\nGot:\n{stderr}",
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("received 10 items"));
    }

    #[test]
    fn test_explicit_allocator_output() {
        let output = Command::new("cargo")
            .args(["run", "-p", "leakcensus", "--example", "explicit_allocator"])
            .output()
            .expect("Failed to execute command");

        assert!(
            output.status.success(),
            "Process did not exit successfully: {output:?}",
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("live allocations: 1"));

        let stderr = String::from_utf8_lossy(&output.stderr);
        let report = report_section(&stderr);
        assert!(report.contains("examples/explicit_allocator.rs\n"), "Got:\n{stderr}");
        assert!(report.contains("    1 leak at line 14\n"), "Got:\n{stderr}");
    }

    #[test]
    fn test_async_multithread_output() {
        let output = run_example("leakcensus-test-tokio-async", "async_multithread", &[]);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let report = report_section(&stderr);

        assert!(report.contains("examples/async_multithread.rs\n"), "Got:\n{stderr}");
        assert!(report.contains("    8 leaks at line 11\n"), "Got:\n{stderr}");
        // the cache is dropped before main returns
        assert!(!report.contains("at line 5\n"), "Got:\n{stderr}");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("cached 8 entries"));
    }

    #[test]
    fn test_json_file_reporter() {
        let path = std::env::temp_dir().join(format!(
            "leakcensus_cli_test_{}.json",
            std::process::id()
        ));
        let path_arg = path.to_string_lossy().to_string();

        let output = Command::new("cargo")
            .args([
                "run",
                "-p",
                "leakcensus-test-tokio-async",
                "--example",
                "json_file_reporter",
                "--features",
                "leakcensus-alloc",
                "--",
                &path_arg,
            ])
            .output()
            .expect("Failed to execute command");

        assert!(
            output.status.success(),
            "Process did not exit successfully: {output:?}",
        );

        let contents = std::fs::read_to_string(&path).expect("Report file missing");
        let _ = std::fs::remove_file(&path);

        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(json["caller_name"], "json_file_reporter::main");
        assert_eq!(json["total_leaks"], 1);
        assert_eq!(json["files"][0]["sites"][0]["line"], 20);
    }

    #[test]
    fn test_show_text() {
        let output = run_cli(&["show", "tests/fixtures/head.json"]);
        assert!(
            output.status.success(),
            "Process did not exit successfully: {output:?}",
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(
            stdout,
            "============\nMEMORY LEAKS\n  src/cache.rs\n    2 leaks at line 41\n    3 leaks at line 88\n  src/config.rs\n    1 leak at line 12\n"
        );
    }

    #[test]
    fn test_show_table() {
        let output = run_cli(&["show", "tests/fixtures/base.json", "--format", "table"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        for expected in ["server::main: 3 leaks", "File", "src/cache.rs", "41"] {
            assert!(
                stdout.contains(expected),
                "Output did not match expected.\nExpected:\n{expected}\n\nGot:\n{stdout}",
            );
        }
    }

    #[test]
    fn test_diff_reports_changed_sites() {
        let output = run_cli(&[
            "diff",
            "--base",
            "tests/fixtures/base.json",
            "--head",
            "tests/fixtures/head.json",
        ]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        for expected in ["3 → 6 leaks", "Change", "88", "+3"] {
            assert!(
                stdout.contains(expected),
                "Output did not match expected.\nExpected:\n{expected}\n\nGot:\n{stdout}",
            );
        }
        assert!(!stdout.contains("src/config.rs"));
    }

    #[test]
    fn test_diff_fail_on_new() {
        let output = run_cli(&[
            "diff",
            "--base",
            "tests/fixtures/base.json",
            "--head",
            "tests/fixtures/head.json",
            "--fail-on-new",
        ]);
        assert!(!output.status.success());

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("1 site(s) leak more than on base"), "Got:\n{stderr}");

        let reversed = run_cli(&[
            "diff",
            "--base",
            "tests/fixtures/head.json",
            "--head",
            "tests/fixtures/base.json",
            "--fail-on-new",
        ]);
        assert!(reversed.status.success());
    }

    #[test]
    fn test_show_missing_file() {
        let output = run_cli(&["show", "tests/fixtures/missing.json"]);
        assert!(!output.status.success());

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("missing.json"), "Got:\n{stderr}");
    }
}
