//! Resolution order across the translator chain

mod common;

use common::{Op, ScriptedTranslator, calls, clear, layer, new_log, read_through};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use stratum_vfs::{FileFlags, OpenFlags, Translator};

#[test]
fn test_open_walks_chain_in_registration_order() {
    let log = new_log();
    let t1: Arc<dyn Translator> = Arc::new(
        ScriptedTranslator::new("t1", &log)
            .with_file("//p.txt", "from t1")
            .declining(Op::Open),
    );
    let t2: Arc<dyn Translator> =
        Arc::new(ScriptedTranslator::new("t2", &log).with_file("//p.txt", "from t2"));

    let vfs = layer(&[Arc::clone(&t1), Arc::clone(&t2)]);
    assert_eq!(read_through(&vfs, "//p.txt").as_deref(), Some("from t2"));
    assert_eq!(calls(&log), vec!["t1:open", "t2:open"]);
}

#[test]
fn test_first_accepting_translator_stops_the_walk() {
    let log = new_log();
    let t1: Arc<dyn Translator> = Arc::new(
        ScriptedTranslator::new("t1", &log)
            .with_file("//p.txt", "from t1")
            .declining(Op::Open),
    );
    let t2: Arc<dyn Translator> =
        Arc::new(ScriptedTranslator::new("t2", &log).with_file("//p.txt", "from t2"));

    let vfs = layer(&[Arc::clone(&t2), Arc::clone(&t1)]);
    let engine = vfs.create_engine("//p.txt").expect("engine");
    assert!(engine.open(OpenFlags::READ));
    assert_eq!(calls(&log), vec!["t2:open"]);
}

#[test]
fn test_open_fails_when_every_translator_declines() {
    let log = new_log();
    let t1: Arc<dyn Translator> = Arc::new(
        ScriptedTranslator::new("t1", &log)
            .with_file("//p.txt", "from t1")
            .declining(Op::Open),
    );

    let vfs = layer(&[t1]);
    let engine = vfs.create_engine("//p.txt").expect("engine");
    assert!(!engine.open(OpenFlags::READ));
    assert!(!engine.is_open());

    let empty = layer(&[]);
    let engine = empty.create_engine("//p.txt").expect("engine");
    assert!(!engine.open(OpenFlags::READ));
}

#[test]
fn test_duplicate_registration_is_ignored() {
    let log = new_log();
    let t1: Arc<dyn Translator> =
        Arc::new(ScriptedTranslator::new("t1", &log).declining(Op::Open));

    let vfs = layer(&[Arc::clone(&t1), Arc::clone(&t1)]);
    assert_eq!(vfs.translator_count(), 1);

    let engine = vfs.create_engine("//p.txt").expect("engine");
    assert!(!engine.open(OpenFlags::READ));
    assert_eq!(calls(&log), vec!["t1:open"]);
}

#[test]
fn test_remove_is_logical_or() {
    let log = new_log();
    let t1: Arc<dyn Translator> = Arc::new(
        ScriptedTranslator::new("t1", &log)
            .with_file("//p.txt", "a")
            .declining(Op::Delete),
    );
    let t2: Arc<dyn Translator> =
        Arc::new(ScriptedTranslator::new("t2", &log).with_file("//p.txt", "b"));

    let vfs = layer(&[t1, t2]);
    let engine = vfs.create_engine("//p.txt").expect("engine");
    assert!(engine.remove());
    assert_eq!(calls(&log), vec!["t1:delete", "t2:delete"]);

    clear(&log);
    assert!(!engine.remove());
}

#[test]
fn test_remove_reaches_every_translator() {
    let log = new_log();
    let t1 = Arc::new(ScriptedTranslator::new("t1", &log).with_file("//p.txt", "a"));
    let t2 = Arc::new(ScriptedTranslator::new("t2", &log).with_file("//p.txt", "b"));

    let vfs = layer(&[t1.clone(), t2.clone()]);
    let engine = vfs.create_engine("//p.txt").expect("engine");
    assert!(engine.remove());
    assert!(!t1.backing().contains("//p.txt"));
    assert!(!t2.backing().contains("//p.txt"));
}

#[test]
fn test_rename_is_first_match() {
    let log = new_log();
    let t1: Arc<dyn Translator> = Arc::new(
        ScriptedTranslator::new("t1", &log)
            .with_file("//p.txt", "a")
            .declining(Op::Rename),
    );
    let t2: Arc<dyn Translator> = Arc::new(
        ScriptedTranslator::new("t2", &log)
            .with_file("//p.txt", "b")
            .declining(Op::Rename),
    );

    let vfs = layer(&[t1, t2]);
    let engine = vfs.create_engine("//p.txt").expect("engine");
    assert!(!engine.rename("//q.txt"));
    assert_eq!(calls(&log), vec!["t1:rename", "t2:rename"]);
}

#[test]
fn test_rename_stops_at_first_success() {
    let log = new_log();
    let t1 = Arc::new(ScriptedTranslator::new("t1", &log).with_file("//p.txt", "a"));
    let t2 = Arc::new(ScriptedTranslator::new("t2", &log).with_file("//p.txt", "b"));

    let vfs = layer(&[t1.clone(), t2.clone()]);
    let engine = vfs.create_engine("//p.txt").expect("engine");
    assert!(engine.rename("//q.txt"));
    assert_eq!(calls(&log), vec!["t1:rename"]);
    assert!(t1.backing().contains("//q.txt"));
    assert!(t2.backing().contains("//p.txt"));
}

#[test]
fn test_stat_is_first_match() {
    let log = new_log();
    let t1: Arc<dyn Translator> = Arc::new(ScriptedTranslator::new("t1", &log));
    let t2: Arc<dyn Translator> =
        Arc::new(ScriptedTranslator::new("t2", &log).with_file("//dir/p.txt", "b"));
    let t3: Arc<dyn Translator> =
        Arc::new(ScriptedTranslator::new("t3", &log).with_file("//dir/p.txt", "c"));

    let vfs = layer(&[t1, t2, t3]);
    let engine = vfs.create_engine("//dir/p.txt").expect("engine");
    assert_eq!(engine.file_flags(), FileFlags::EXISTS | FileFlags::FILE);
    assert_eq!(calls(&log), vec!["t1:stats", "t2:stats"]);
}

#[test]
fn test_open_handle_survives_unregistration() {
    let log = new_log();
    let t1: Arc<dyn Translator> =
        Arc::new(ScriptedTranslator::new("t1", &log).with_file("//p.txt", "still here"));

    let vfs = layer(&[Arc::clone(&t1)]);
    let engine = vfs.create_engine("//p.txt").expect("engine");
    assert!(engine.open(OpenFlags::READ));

    assert!(vfs.unregister_translator(&t1));
    drop(t1);

    let mut buf = [0u8; 10];
    assert_eq!(engine.read(&mut buf), 10);
    assert_eq!(&buf, b"still here");

    assert!(engine.close());
    assert!(!engine.open(OpenFlags::READ));
}

#[test]
fn test_registration_visible_to_next_call() {
    let log = new_log();
    let vfs = layer(&[]);
    let engine = vfs.create_engine("//p.txt").expect("engine");
    assert!(!engine.open(OpenFlags::READ));

    let t1: Arc<dyn Translator> =
        Arc::new(ScriptedTranslator::new("t1", &log).with_file("//p.txt", "late"));
    vfs.register_translator(t1);
    assert!(engine.open(OpenFlags::READ));
}

#[test]
fn test_mkdir_asks_first_translator_only() {
    let log = new_log();
    let t1: Arc<dyn Translator> =
        Arc::new(ScriptedTranslator::new("t1", &log).declining(Op::CreateDir));
    let t2: Arc<dyn Translator> = Arc::new(ScriptedTranslator::new("t2", &log));

    let vfs = layer(&[t1, t2]);
    let engine = vfs.create_engine("//base").expect("engine");
    assert!(!engine.mkdir("//base/new", true));
    assert_eq!(calls(&log), vec!["t1:create_dir"]);
}
