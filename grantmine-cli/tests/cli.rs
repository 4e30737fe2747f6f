/*
 * Copyright Grantmine Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::fs;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;

const READ_BUCKET: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [{
        "Effect": "Allow",
        "Principal": {"AWS": ["*"]},
        "Action": ["s3:Get*", "s3:GetObject"],
        "Resource": ["arn:aws:s3:::bucket/*"]
    }]
}"#;

fn grantmine() -> Command {
    Command::cargo_bin("grantmine").expect("binary builds")
}

fn cvc5_available() -> bool {
    let path = std::env::var("CVC5").unwrap_or_else(|_| "cvc5".into());
    StdCommand::new(path)
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

#[test]
fn help_lists_the_solver_choices() {
    grantmine()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--solver"))
        .stdout(predicate::str::contains("cvc5"))
        .stdout(predicate::str::contains("z3"));
}

#[test]
fn missing_input_file_fails() {
    grantmine()
        .args(["--file", "no/such/policy.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no/such/policy.json"));
}

#[test]
fn malformed_json_fails_with_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();
    grantmine()
        .args(["--file", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.json"));
}

#[test]
fn unknown_operator_is_reported_before_any_solver_starts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad-op.json");
    fs::write(
        &path,
        r#"{"Statement": [{
            "Effect": "Allow",
            "Action": "a",
            "Resource": "r",
            "Condition": {"DateGreaterThan": {"aws:SourceArn": "x"}}
        }]}"#,
    )
    .unwrap();
    grantmine()
        .args(["--file", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DateGreaterThan"));
}

#[test]
fn end_to_end_mine_with_cvc5() {
    if !cvc5_available() {
        eprintln!("skipping: no cvc5 binary on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.json");
    fs::write(&path, READ_BUCKET).unwrap();

    grantmine()
        .args(["--file", path.to_str().unwrap()])
        .assert()
        .success();

    let findings = fs::read_to_string(dir.path().join("policy.findings.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&findings).unwrap();
    let mined = value["Findings"].as_array().unwrap();
    assert_eq!(mined.len(), 1);
    assert_eq!(mined[0]["Action"][0], "s3:Get*");
    assert_eq!(mined[0]["Resource"][0], "arn:aws:s3:::bucket/*");

    let csv = fs::read_to_string(dir.path().join("policy.rounds.csv")).unwrap();
    assert!(csv.starts_with("SingleRound,AllRound,WholeTime"));
    assert!(csv.lines().count() > 1);
}

#[test]
fn end_to_end_reduce_with_cvc5() {
    if !cvc5_available() {
        eprintln!("skipping: no cvc5 binary on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.json");
    fs::write(&path, READ_BUCKET).unwrap();

    grantmine()
        .args(["--file", path.to_str().unwrap(), "--reduce"])
        .assert()
        .success();

    let findings = fs::read_to_string(dir.path().join("policy.findings.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&findings).unwrap();
    assert_eq!(value["Findings"].as_array().unwrap().len(), 1);
}
