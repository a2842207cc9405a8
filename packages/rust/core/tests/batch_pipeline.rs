//! End-to-end batch pass over a temp content tree with a scripted
//! completion client.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use feedmill_core::{
    BatchConfig, CompletionClient, SilentProgress, TransformConfig, candidates, run_batch,
};
use feedmill_shared::{COMPLETION_MARK, FeedmillError, Result};

/// Replies with a fixed three-segment answer, or times out for prompts
/// containing `fail_on`.
struct Scripted {
    fail_on: Option<&'static str>,
    calls: AtomicUsize,
}

impl Scripted {
    fn ok() -> Self {
        Self {
            fail_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_on(marker: &'static str) -> Self {
        Self {
            fail_on: Some(marker),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionClient for Scripted {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.is_some_and(|m| prompt.contains(m)) {
            return Err(FeedmillError::Generation(
                "request timed out after 120s".into(),
            ));
        }
        Ok("=== TRANSLATION ===\n这是译文。\n\
=== SUMMARY ===\n这是摘要。\n\
=== DESCRIPTION ===\nA one-sentence description.\n"
            .into())
    }
}

struct Tree {
    root: PathBuf,
}

impl Tree {
    fn new() -> Self {
        let root = std::env::temp_dir().join(format!("fm-batch-it-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(root.join("raw")).unwrap();
        Self { root }
    }

    fn src(&self) -> PathBuf {
        self.root.join("raw")
    }

    fn dst(&self) -> PathBuf {
        self.root.join("out")
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.src().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn config(&self) -> BatchConfig {
        BatchConfig {
            source_root: self.src(),
            dest_root: self.dst(),
            transform: TransformConfig {
                target_language: "Simplified Chinese".into(),
                summary_max_chars: 200,
                chunk_chars: 24_000,
                model: "deepseek-chat".into(),
            },
        }
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(files_under(&path));
        } else {
            out.push(path);
        }
    }
    out.sort();
    out
}

const ARTICLE: &str = "---\n\
title: \"Agents that plan\"\n\
date: \"2025-06-11T08:00:00Z\"\n\
link: \"https://arxiv.org/abs/2506.00001\"\n\
tags:\n  - agents\n  - planning # keep this comment\n\
description: null\n\
---\n\n\
We study planning.\n";

#[tokio::test]
async fn walker_skips_marked_document() {
    let tree = Tree::new();
    let a = tree.write("a.md", "A\n");
    tree.write("[ds]b.md", "B\n");

    let found: Vec<_> = candidates(&tree.src()).collect();
    assert_eq!(found, vec![a]);

    let client = Scripted::ok();
    let report = run_batch(&tree.config(), &client, &SilentProgress).await;
    assert_eq!(report.total, 1);
    assert_eq!(client.calls(), 1);
    assert!(!tree.dst().join("[ds]b.md").exists());
    assert!(!tree.dst().join("b.md").exists());
}

#[tokio::test]
async fn second_pass_writes_nothing() {
    let tree = Tree::new();
    tree.write("_Feed/2025-06-11_Agents that plan.md", ARTICLE);
    let client = Scripted::ok();

    let first = run_batch(&tree.config(), &client, &SilentProgress).await;
    assert_eq!(first.succeeded.len(), 1);
    let dest = tree.dst().join("_Feed/2025-06-11_Agents that plan.md");
    let published = std::fs::read_to_string(&dest).unwrap();
    let modified = std::fs::metadata(&dest).unwrap().modified().unwrap();
    let sources_after_first = files_under(&tree.src());

    let second = run_batch(&tree.config(), &client, &SilentProgress).await;

    assert_eq!(second.total, 0);
    assert_eq!(client.calls(), 1, "exactly one generation call across both runs");
    assert_eq!(files_under(&tree.src()), sources_after_first, "exactly one rename");
    assert_eq!(files_under(&tree.dst()), vec![dest.clone()]);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), published);
    assert_eq!(std::fs::metadata(&dest).unwrap().modified().unwrap(), modified);
}

#[tokio::test]
async fn generation_timeout_leaves_source_untouched() {
    let tree = Tree::new();
    let a = tree.write("a.md", "---\ntitle: A\n---\n\nslow article\n");
    let b = tree.write("b.md", "---\ntitle: B\n---\n\nfast article\n");
    let client = Scripted::failing_on("slow article");

    let report = run_batch(&tree.config(), &client, &SilentProgress).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, a);
    assert!(report.failed[0].1.contains("timed out"));
    assert!(a.exists(), "a.md stays unmarked and unmoved");
    assert!(!tree.dst().join("a.md").exists());
    assert_eq!(
        std::fs::read_to_string(&a).unwrap(),
        "---\ntitle: A\n---\n\nslow article\n"
    );

    assert!(!b.exists());
    assert!(tree.src().join("[ds]b.md").exists());
    assert_eq!(report.succeeded.len(), 1);

    // The failed document is retried on the next run.
    let retry = Scripted::ok();
    let report = run_batch(&tree.config(), &retry, &SilentProgress).await;
    assert_eq!(report.total, 1);
    assert!(report.is_clean());
    assert!(tree.dst().join("a.md").exists());
}

#[tokio::test]
async fn null_description_is_filled_and_other_fields_preserved() {
    let tree = Tree::new();
    tree.write("a.md", ARTICLE);

    run_batch(&tree.config(), &Scripted::ok(), &SilentProgress).await;

    let out = std::fs::read_to_string(tree.dst().join("a.md")).unwrap();
    assert!(out.contains("\ndescription: \"A one-sentence description.\"\n"));
    assert!(!out.contains("description: null"));
    assert!(out.starts_with("---\ntitle: \"Agents that plan\"\n"));
    assert!(out.contains("\ntags:\n  - agents\n  - planning # keep this comment\n"));
    assert!(out.contains("\npubDatetime: \"2025-06-11T08:00:00Z\"\n"));
    assert!(!out.contains("\nlink:"));
    assert!(out.contains(
        "*[Source](https://arxiv.org/abs/2506.00001) translated and summarized by deepseek-chat*"
    ));
    assert!(out.contains("## Summary\n\n这是摘要。\n\n---\n\n这是译文。\n"));
    assert!(!out.contains("We study planning."));

    // The source keeps its original content under the marked name.
    let marked = tree.src().join(format!("{COMPLETION_MARK}a.md"));
    assert_eq!(std::fs::read_to_string(marked).unwrap(), ARTICLE);
}

#[tokio::test]
async fn every_mark_has_a_published_destination() {
    let tree = Tree::new();
    tree.write("x/one.md", "one\n");
    tree.write("x/y/two.md", "two\n");
    tree.write("three.md", "three\n");
    tree.write("skip.txt", "not markdown\n");

    let report = run_batch(&tree.config(), &Scripted::ok(), &SilentProgress).await;
    assert_eq!(report.total, 3);
    assert!(report.is_clean());

    for source in files_under(&tree.src()) {
        let name = source.file_name().unwrap().to_str().unwrap();
        let Some(original) = name.strip_prefix(COMPLETION_MARK) else {
            continue;
        };
        let rel = source.parent().unwrap().strip_prefix(tree.src()).unwrap();
        let dest = tree.dst().join(rel).join(original);
        let content = std::fs::read_to_string(&dest).unwrap();
        assert!(!content.is_empty(), "{} published empty", dest.display());
    }
    assert!(tree.src().join("skip.txt").exists());
}

#[tokio::test]
async fn unwritable_destination_fails_document_and_pass_continues() {
    let tree = Tree::new();
    let blocked = tree.write("feed/a.md", "---\ntitle: A\n---\n\nblocked article\n");
    let other = tree.write("z.md", "---\ntitle: Z\n---\n\nfine article\n");
    // A plain file where the destination subdirectory must go.
    std::fs::create_dir_all(tree.dst()).unwrap();
    std::fs::write(tree.dst().join("feed"), "occupied").unwrap();

    let client = Scripted::ok();
    let report = run_batch(&tree.config(), &client, &SilentProgress).await;

    assert_eq!(report.total, 2);
    assert_eq!(client.calls(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, blocked);
    assert!(report.partial.is_empty());

    assert!(blocked.exists(), "source stays unmarked");
    assert!(!tree.src().join(format!("feed/{COMPLETION_MARK}a.md")).exists());
    assert_eq!(
        std::fs::read_to_string(tree.dst().join("feed")).unwrap(),
        "occupied"
    );
    assert_eq!(
        files_under(&tree.dst()),
        vec![tree.dst().join("feed"), tree.dst().join("z.md")],
        "no stray or partial files in the destination"
    );

    assert!(!other.exists());
    assert_eq!(report.succeeded, vec![other.clone()]);
    assert!(tree.src().join(format!("{COMPLETION_MARK}z.md")).exists());
}
