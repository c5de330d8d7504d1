use super::*;

#[test]
fn disallowed_commands_are_rejected() {
    for command in ["rm", "curl", "sh", "pwd2"] {
        assert!(validate_command(command, &[]).is_err(), "{command} should be rejected");
    }
}

#[test]
fn pwd_and_ls_resolve() {
    assert!(validate_command("pwd", &[]).is_ok());
    assert!(validate_command("ls", &["shared".to_string()]).is_ok());
}

#[test]
fn cat_accepts_shared_paths() {
    assert!(validate_command("cat", &["shared".to_string()]).is_ok());
    assert!(validate_command("cat", &["shared/report.txt".to_string()]).is_ok());
}

#[test]
fn cat_rejects_path_traversal() {
    assert!(validate_command("cat", &["shared/../secrets.txt".to_string()]).is_err());
    assert!(validate_command("cat", &["../shared/x".to_string()]).is_err());
}

#[test]
fn cat_rejects_absolute_and_escaping_paths() {
    assert!(validate_command("cat", &["/etc/passwd".to_string()]).is_err());
    assert!(validate_command("cat", &["other/x".to_string()]).is_err());
    assert!(validate_command("cat", &["sharedx".to_string()]).is_err());
}

#[test]
fn cat_requires_at_least_one_path() {
    assert!(validate_command("cat", &[]).is_err());
}
