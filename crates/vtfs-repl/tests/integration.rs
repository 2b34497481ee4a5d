//! Integration tests for the vtfs REPL.
//!
//! These tests run scripts through the REPL and verify behavior.

use rstest::rstest;
use vtfs_core::StoreConfig;
use vtfs_repl::Repl;

/// Helper to run multiple lines through a REPL and collect outputs.
fn run_script(script: &str) -> Vec<String> {
    let mut repl = Repl::new(StoreConfig::small_pages()).expect("Failed to create REPL");
    run_lines(&mut repl, script)
}

fn run_lines(repl: &mut Repl, script: &str) -> Vec<String> {
    let mut outputs = Vec::new();
    for line in script.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match repl.process_line(line) {
            Ok(Some(output)) => outputs.push(output),
            Ok(None) => {}
            Err(e) => outputs.push(format!("ERROR: {e:#}")),
        }
    }
    outputs
}

/// Helper to check if output contains expected strings.
fn outputs_contain(outputs: &[String], expected: &[&str]) -> bool {
    let joined = outputs.join("\n");
    expected.iter().all(|e| joined.contains(e))
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn write_then_cat() {
    let outputs = run_script(
        r#"
        mkdir /a
        write /a/b hello
        cat /a/b
    "#,
    );
    assert_eq!(outputs, vec!["5 bytes", "hello"]);
}

#[test]
fn write_replaces_and_append_extends() {
    let outputs = run_script(
        r#"
        write f first version
        write f second
        append f -and-more
        cat f
    "#,
    );
    assert_eq!(outputs.last().map(String::as_str), Some("second-and-more"));
}

#[test]
fn truncate_empties_file() {
    let outputs = run_script(
        r#"
        write f some bytes
        truncate f
        cat f
        stat f
    "#,
    );
    assert_eq!(outputs[1], "");
    assert!(outputs[2].contains("Size: 0  Blocks: 0"), "got: {}", outputs[2]);
}

#[test]
fn touch_existing_file_keeps_content() {
    let outputs = run_script(
        r#"
        write f keep me
        touch f
        cat f
    "#,
    );
    assert_eq!(outputs.last().map(String::as_str), Some("keep me"));
}

// ============================================================================
// Hardlinks
// ============================================================================

#[test]
fn hardlink_shares_content() {
    let outputs = run_script(
        r#"
        mkdir /a
        write /a/b hello
        ln /a/b /a/c
        cat /a/c
        write /a/c HELLO
        cat /a/b
        stat /a/c
    "#,
    );
    assert!(outputs_contain(&outputs, &["hello", "HELLO", "(hardlink)", "Links: 2"]));
}

#[test]
fn hardlink_outlives_original() {
    let outputs = run_script(
        r#"
        write orig data
        ln orig alias
        rm orig
        cat alias
        cat orig
    "#,
    );
    assert!(outputs_contain(&outputs, &["data", "ERROR: orig: no such entry (errno 2)"]));
}

#[test]
fn link_to_directory_is_rejected() {
    let outputs = run_script(
        r#"
        mkdir d
        ln d alias
    "#,
    );
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].contains("errno 21"), "got: {}", outputs[0]);
}

// ============================================================================
// Directories
// ============================================================================

#[test]
fn ls_lists_newest_first() {
    let outputs = run_script(
        r#"
        touch A
        touch B
        mkdir C
        ls
    "#,
    );
    let names: Vec<&str> = outputs[0]
        .lines()
        .map(|l| l.rsplit(' ').next().unwrap_or(""))
        .collect();
    assert_eq!(names, vec![".", "..", "C", "B", "A"]);
    assert!(outputs[0].lines().nth(2).unwrap().starts_with('d'));
}

#[test]
fn cd_and_pwd() {
    let outputs = run_script(
        r#"
        mkdir /x
        mkdir /x/y
        cd /x/y
        pwd
        cd ..
        pwd
        cd
        pwd
    "#,
    );
    assert_eq!(outputs, vec!["/x/y", "/x", "/"]);
}

#[test]
fn cd_into_file_fails() {
    let outputs = run_script(
        r#"
        touch f
        cd f
        pwd
    "#,
    );
    assert!(outputs[0].contains("errno 20"));
    assert_eq!(outputs[1], "/");
}

#[rstest]
#[case::not_empty("mkdir d\ntouch d/f\nrmdir d", 39)]
#[case::exists("mkdir d\nmkdir d", 17)]
#[case::not_a_directory("touch f\nrmdir f", 20)]
#[case::is_a_directory("mkdir d\nrm d", 21)]
#[case::missing("rmdir nothing", 2)]
fn errors_carry_errno(#[case] script: &str, #[case] errno: i32) {
    let outputs = run_script(script);
    let error = outputs
        .iter()
        .find(|o| o.starts_with("ERROR"))
        .expect("script should fail");
    assert!(error.contains(&format!("(errno {errno})")), "got: {error}");
}

#[test]
fn rmdir_then_rmdir_again() {
    let outputs = run_script(
        r#"
        mkdir d
        rmdir d
        rmdir d
    "#,
    );
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].contains("errno 2"));
}

// ============================================================================
// Inspection and meta-commands
// ============================================================================

#[test]
fn df_reports_magic_and_entries() {
    let outputs = run_script(
        r#"
        mkdir d
        write d/f 12345
        df
    "#,
    );
    let df = outputs.last().unwrap();
    assert!(df.contains("magic=0xdeadbabe"), "got: {df}");
    assert!(df.contains("entries=3"));
    assert!(df.contains("allocated=16"));
}

#[test]
fn stat_root() {
    let outputs = run_script("stat /");
    assert!(outputs_contain(&outputs, &["Inode: 1", "drwxrwxrwx", "Links: 2"]));
}

#[test]
fn help_and_unknown_commands() {
    let outputs = run_script(
        r#"
        /help
        frobnicate
        /nope
    "#,
    );
    assert!(outputs[0].contains("Hardlink DST"));
    assert!(outputs[1].starts_with("Unknown command: frobnicate"));
    assert!(outputs[2].starts_with("Unknown command: /nope"));
}

#[test]
fn quit_sets_flag_and_shutdown_frees_store() {
    let mut repl = Repl::new(StoreConfig::default()).unwrap();
    run_lines(
        &mut repl,
        r#"
        mkdir a
        write a/f x
        ln a/f g
    "#,
    );
    assert!(!repl.should_quit());
    repl.process_line("/quit").unwrap();
    assert!(repl.should_quit());
    assert_eq!(repl.shutdown(), 4);
}

#[test]
fn usage_errors() {
    let outputs = run_script(
        r#"
        mkdir
        ln onlyone
        write
    "#,
    );
    assert_eq!(outputs.len(), 3);
    assert!(outputs.iter().all(|o| o.starts_with("ERROR: usage:")));
}
