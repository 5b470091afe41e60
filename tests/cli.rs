use assert_cmd::Command;
use predicates::prelude::*;

fn argbind() -> Command {
    Command::cargo_bin("argbind").expect("binary exists")
}

const LEVEL: &[&str] = &[
    "-f",
    "level",
    "--flag-level-short",
    "l",
    "--flag-level-default",
    "info",
    "--flag-level-choices",
    "debug,info,warn",
    "-f",
    "tags",
    "--flag-tags-multi",
];

fn bind(shell: &str, user: &[&str]) -> Command {
    let mut cmd = argbind();
    cmd.arg("bind")
        .args(["--shell", shell])
        .args(LEVEL)
        .arg("--")
        .arg("./script.sh")
        .args(user);
    cmd
}

#[test]
fn bind_prints_posix_assignments() {
    bind("sh", &["--tags", "a, b", "--tags", "c", "x"])
        .assert()
        .success()
        .stdout("LEVEL='info'\nTAGS='a,b,c'\n");
}

#[test]
fn bind_accepts_short_alias() {
    bind("bash", &["-l", "warn"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("LEVEL='warn'\n"));
}

#[test]
fn bind_rejects_value_outside_choices() {
    bind("sh", &["--level", "trace", "--tags", "a"])
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains(r#"invalid value "trace" for flag --level"#));
}

#[test]
fn bind_prints_powershell_assignments() {
    bind("pwsh", &["--level", "debug"])
        .assert()
        .success()
        .stdout("$Env:LEVEL = 'debug'\n$Env:TAGS = ''\n");
}

#[test]
fn bind_prints_cmd_assignments() {
    bind("cmd", &[])
        .assert()
        .success()
        .stdout("set \"LEVEL=info\"\r\nset \"TAGS=\"\r\n");
}

#[test]
fn bind_help_goes_to_stderr() {
    bind("sh", &["-h"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("--level").and(predicate::str::contains("./script.sh")));
}

#[test]
fn bind_help_var_receives_help_text() {
    argbind()
        .args(["bind", "--shell", "sh", "--help-var", "USAGE", "--help-export"])
        .args(LEVEL)
        .args(["--", "./script.sh", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("export USAGE='").and(predicate::str::contains("--tags")));
}

#[test]
fn bind_checks_positional_count() {
    argbind()
        .args(["bind", "--shell", "sh", "-a", "[1,2]", "--", "./script.sh"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("accepts between 1 and 2 arg(s), received 0"));

    argbind()
        .args(["bind", "--shell", "sh", "-a", "[1,2]", "--args-var", "FILES"])
        .args(["--", "./script.sh", "a b", "c"])
        .assert()
        .success()
        .stdout("FILES='a b,c'\n");
}

#[test]
fn bind_requires_required_flags() {
    argbind()
        .args(["bind", "--shell", "sh", "-f", "out", "--flag-out-required"])
        .args(["--", "./script.sh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#"required flag(s) "out" not set"#));
}

#[test]
fn bind_writes_output_file() {
    let output = argbind()
        .args(["bind", "--shell", "sh", "--output-file", "-p", "APP_", "-f", "x"])
        .args(["--", "./script.sh", "--x", "1"])
        .output()
        .expect("binary runs");
    assert!(output.status.success());
    let path = String::from_utf8(output.stdout).unwrap();
    let path = path.trim_end();
    assert!(path.ends_with(".sh"), "{}", path);
    assert_eq!(std::fs::read_to_string(path).unwrap(), "APP_X='1'\n");
    std::fs::remove_file(path).unwrap();
}

#[test]
fn bind_requires_script_name() {
    argbind()
        .args(["bind", "--shell", "sh", "-f", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least $0 should be provided"));
}

#[test]
fn bind_rejects_repeated_flags() {
    argbind()
        .args(["bind", "--shell", "sh", "-f", "a", "-f", "a", "--", "./script.sh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("repeated flag names: a"));

    argbind()
        .args(["bind", "--shell", "sh", "-r", "-f", "a", "-f", "a", "--", "./script.sh"])
        .assert()
        .success()
        .stdout("A=''\n");
}

#[test]
fn bind_accepts_clustered_declarations() {
    argbind()
        .args(["bind", "--shell", "sh", "-rf", "a", "-f", "a", "--", "./script.sh", "--a", "1"])
        .assert()
        .success()
        .stdout("A='1'\n");
}

#[test]
fn bind_applies_no_opt_default() {
    let color = |user: &[&str]| {
        let mut cmd = argbind();
        cmd.args(["bind", "--shell", "sh", "-f", "color"])
            .args(["--flag-color-no-opt-default", "always"])
            .args(["--", "./script.sh"])
            .args(user);
        cmd
    };
    color(&["--color"]).assert().success().stdout("COLOR='always'\n");
    color(&["--color=never"]).assert().success().stdout("COLOR='never'\n");
    color(&[]).assert().success().stdout("COLOR=''\n");
}

#[test]
fn bind_rejects_conflicting_flag_names() {
    argbind()
        .args(["bind", "--shell", "sh", "-f", "x,x-no-opt", "--", "./script.sh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--flag-x-no-opt-default"));
}

#[test]
fn bind_without_options_keeps_separator() {
    argbind()
        .env("SHELL", "/bin/sh")
        .args(["bind", "--", "./script.sh"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn bind_help_describes_options() {
    argbind()
        .args(["bind", "-f", "level", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--flag-level-default"));
}

#[test]
fn filter_prints_normalized_form() {
    argbind()
        .args(["filter", "1-3_4", "--normalize"])
        .assert()
        .success()
        .stdout("1-4\n");
}

#[test]
fn filter_tests_numbers() {
    argbind()
        .args(["filter", "1_3-5_7-7", "4", "7"])
        .assert()
        .success();

    argbind()
        .args(["filter", "1_3-5_7-7", "4", "6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("6"));
}

#[test]
fn filter_rejects_decreasing_literal() {
    argbind()
        .args(["filter", "3_1-4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-decreasing"));
}
