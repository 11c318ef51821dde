//! Integration tests for the snapshot lifecycle
//!
//! These tests exercise the full manager surface: acquisition isolation
//! across commits, exactly-once release, all-or-nothing acquisition, and
//! deferred language retirement.

use cuttle::{
    CuttleError, Document, DocumentBatch, FacetLabel, LanguageCode, SearchManager,
};

fn lang(code: &str) -> LanguageCode {
    LanguageCode::new(code).unwrap()
}

fn batch_of(docs: &[(u64, &str)]) -> DocumentBatch {
    let mut batch = DocumentBatch::new();
    for (id, content) in docs {
        batch = batch.add(Document::new(*id, *content));
    }
    batch
}

#[test]
fn test_snapshot_isolated_from_later_commits() {
    let manager = SearchManager::in_memory();
    let en = lang("en");

    manager
        .commit(&en, &batch_of(&[(1, "quartz vein"), (2, "quartz outcrop")]))
        .unwrap();

    let first = manager.acquire_snapshot(None).unwrap();
    assert_eq!(first.term_hits("quartz").unwrap(), 2);
    assert_eq!(first.generation(&en), Some(1));

    // Commit while the first snapshot is still held
    manager
        .commit(&en, &batch_of(&[(3, "quartz sample")]))
        .unwrap();
    assert_eq!(manager.current_generation(&en), Some(2));

    // The superseded language and taxonomy generations stay open for the
    // holder instead of being closed under it
    assert_eq!(manager.retired_generations(), 2);

    let second = manager.acquire_snapshot(None).unwrap();
    assert_eq!(second.term_hits("quartz").unwrap(), 3);
    assert_eq!(second.generation(&en), Some(2));

    // Unchanged view on the older snapshot
    assert_eq!(first.term_hits("quartz").unwrap(), 2);

    manager.release(&first).unwrap();
    assert_eq!(manager.retired_generations(), 0);
    manager.release(&second).unwrap();

    // One current generation per tracker: language plus taxonomy
    assert_eq!(manager.open_generations(), 2);
    assert_eq!(manager.current_ref_count(&en), Some(1));
}

#[test]
fn test_overlapping_snapshots_released_out_of_order() {
    let manager = SearchManager::in_memory();
    let en = lang("en");

    manager.commit(&en, &batch_of(&[(1, "basalt")])).unwrap();
    let s1 = manager.acquire_snapshot(None).unwrap();

    manager.commit(&en, &batch_of(&[(2, "basalt")])).unwrap();
    let s2 = manager.acquire_snapshot(None).unwrap();

    manager.commit(&en, &batch_of(&[(3, "basalt")])).unwrap();
    let s3 = manager.acquire_snapshot(None).unwrap();
    let s4 = manager.acquire_snapshot(None).unwrap();

    assert_eq!(s1.generation(&en), Some(1));
    assert_eq!(s2.generation(&en), Some(2));
    assert_eq!(s3.generation(&en), Some(3));
    assert_eq!(s4.generation(&en), Some(3));
    assert_eq!(s3.taxonomy_generation(), s4.taxonomy_generation());

    // Two superseded language generations and two taxonomy generations are
    // pinned by s1 and s2
    assert_eq!(manager.retired_generations(), 4);
    assert_eq!(manager.current_ref_count(&en), Some(3));

    // Release order does not matter
    manager.release(&s2).unwrap();
    manager.release(&s4).unwrap();
    manager.release(&s1).unwrap();
    assert_eq!(manager.retired_generations(), 0);
    assert_eq!(manager.current_ref_count(&en), Some(2));

    manager.release(&s3).unwrap();
    assert_eq!(manager.current_ref_count(&en), Some(1));
    assert_eq!(manager.open_generations(), 2);
}

#[test]
fn test_failed_acquisition_leaves_no_references() {
    let manager = SearchManager::in_memory();
    let en = lang("en");
    let fr = lang("fr");

    manager.commit(&en, &batch_of(&[(1, "quartz")])).unwrap();
    manager.commit(&fr, &batch_of(&[(2, "granit")])).unwrap();

    let err = manager
        .acquire_snapshot(Some(&[en.clone(), fr.clone(), lang("xx")]))
        .unwrap_err();
    assert!(matches!(err, CuttleError::NoSuchLanguage(code) if code == lang("xx")));

    // Rolled back: no reference was left on the valid languages
    assert_eq!(manager.current_ref_count(&en), Some(1));
    assert_eq!(manager.current_ref_count(&fr), Some(1));
    assert_eq!(manager.metrics().active_snapshots.get(), 0.0);

    // A well-formed filter still succeeds afterwards
    let snapshot = manager
        .acquire_snapshot(Some(&[en.clone(), fr.clone()]))
        .unwrap();
    assert_eq!(snapshot.doc_count().unwrap(), 2);
    manager.release(&snapshot).unwrap();
}

#[test]
fn test_filtered_acquisition_covers_only_requested_languages() {
    let manager = SearchManager::in_memory();
    let en = lang("en");
    let fr = lang("fr");

    manager.commit(&en, &batch_of(&[(1, "quartz")])).unwrap();
    manager.commit(&fr, &batch_of(&[(2, "granit")])).unwrap();

    let snapshot = manager
        .acquire_snapshot(Some(std::slice::from_ref(&fr)))
        .unwrap();
    assert_eq!(snapshot.languages(), vec![fr.clone()]);
    assert_eq!(snapshot.term_hits("granit").unwrap(), 1);
    assert_eq!(snapshot.term_hits("quartz").unwrap(), 0);
    assert_eq!(snapshot.language_doc_count(&en).unwrap(), None);
    manager.release(&snapshot).unwrap();
}

#[test]
fn test_double_release_detected() {
    let manager = SearchManager::in_memory();
    manager
        .commit(&lang("en"), &batch_of(&[(1, "quartz")]))
        .unwrap();

    let snapshot = manager.acquire_snapshot(None).unwrap();
    manager.release(&snapshot).unwrap();

    assert!(matches!(
        manager.release(&snapshot),
        Err(CuttleError::DoubleRelease)
    ));
    assert_eq!(manager.metrics().double_releases.get(), 1.0);

    // The failed second release did not disturb the tracker state
    assert_eq!(manager.current_ref_count(&lang("en")), Some(1));
    assert_eq!(manager.retired_generations(), 0);
}

#[test]
fn test_reads_fail_after_release() {
    let manager = SearchManager::in_memory();
    manager
        .commit(&lang("en"), &batch_of(&[(1, "quartz")]))
        .unwrap();

    let snapshot = manager.acquire_snapshot(None).unwrap();
    manager.release(&snapshot).unwrap();

    assert!(matches!(
        snapshot.term_hits("quartz"),
        Err(CuttleError::UseAfterRelease)
    ));
    assert!(matches!(
        snapshot.doc_count(),
        Err(CuttleError::UseAfterRelease)
    ));
    assert!(matches!(
        snapshot.facet_count(),
        Err(CuttleError::UseAfterRelease)
    ));
}

#[test]
fn test_generations_are_monotonic() {
    let manager = SearchManager::in_memory();
    let en = lang("en");

    let mut last = 0;
    for id in 1..=5 {
        manager.commit(&en, &batch_of(&[(id, "fjord")])).unwrap();
        let snapshot = manager.acquire_snapshot(None).unwrap();
        let seq = snapshot.generation(&en).unwrap();
        assert!(seq > last);
        assert_eq!(snapshot.taxonomy_generation(), seq);
        last = seq;
        manager.release(&snapshot).unwrap();
    }
    assert_eq!(last, 5);
}

#[test]
fn test_updates_and_deletes_visible_to_new_snapshots_only() {
    let manager = SearchManager::in_memory();
    let en = lang("en");

    manager
        .commit(&en, &batch_of(&[(1, "quartz vein"), (2, "basalt flow")]))
        .unwrap();
    let before = manager.acquire_snapshot(None).unwrap();

    manager
        .commit(
            &en,
            &DocumentBatch::new()
                .delete(1)
                .update(2, Document::new(2, "fjord shoreline")),
        )
        .unwrap();

    let after = manager.acquire_snapshot(None).unwrap();
    assert_eq!(after.doc_count().unwrap(), 1);
    assert_eq!(after.term_hits("quartz").unwrap(), 0);
    assert_eq!(after.term_hits("basalt").unwrap(), 0);
    assert_eq!(after.search("fjord").unwrap(), vec![2]);

    // The earlier snapshot keeps the pre-commit view
    assert_eq!(before.doc_count().unwrap(), 2);
    assert_eq!(before.search("quartz").unwrap(), vec![1]);

    manager.release(&before).unwrap();
    manager.release(&after).unwrap();
}

#[test]
fn test_taxonomy_paired_with_language_commits() {
    let manager = SearchManager::in_memory();
    let en = lang("en");
    let fr = lang("fr");

    manager
        .commit(
            &en,
            &DocumentBatch::new()
                .add(Document::new(1, "hydrographic survey").with_facet("keyword", "oceans")),
        )
        .unwrap();
    let old = manager.acquire_snapshot(None).unwrap();

    manager
        .commit(
            &fr,
            &DocumentBatch::new()
                .add(Document::new(2, "carte marine").with_facet("keyword", "navigation")),
        )
        .unwrap();

    // The held snapshot is paired with the taxonomy state of its own
    // acquisition, not the latest one
    assert!(old.has_facet(&FacetLabel::new("keyword", "oceans")).unwrap());
    assert!(!old
        .has_facet(&FacetLabel::new("keyword", "navigation"))
        .unwrap());
    assert_eq!(old.facet_count().unwrap(), 1);

    let new = manager.acquire_snapshot(None).unwrap();
    assert_eq!(new.facet_count().unwrap(), 2);
    assert!(new
        .has_facet(&FacetLabel::new("keyword", "navigation"))
        .unwrap());

    manager.release(&old).unwrap();
    manager.release(&new).unwrap();
}

#[test]
fn test_retirement_deferred_until_last_holder_releases() {
    let manager = SearchManager::in_memory();
    let en = lang("en");
    let fr = lang("fr");

    manager.commit(&en, &batch_of(&[(1, "quartz")])).unwrap();
    manager.commit(&fr, &batch_of(&[(2, "granit")])).unwrap();

    let s1 = manager.acquire_snapshot(None).unwrap();
    let s2 = manager.acquire_snapshot(None).unwrap();

    manager.retire_language(&fr).unwrap();

    // Gone for new acquisitions, still readable through the held snapshots
    assert_eq!(manager.languages(), vec![en.clone()]);
    let later = manager.acquire_snapshot(None).unwrap();
    assert_eq!(later.languages(), vec![en.clone()]);
    assert_eq!(s1.term_hits("granit").unwrap(), 1);

    manager.release(&s1).unwrap();
    assert_eq!(s2.term_hits("granit").unwrap(), 1);
    manager.release(&s2).unwrap();
    manager.release(&later).unwrap();

    // Last holder gone, the tracker was torn down: language gen plus
    // taxonomy gen remain for en only
    assert_eq!(manager.open_generations(), 2);
    assert!(manager.current_generation(&fr).is_none());
    assert!(matches!(
        manager.acquire_snapshot(Some(std::slice::from_ref(&fr))),
        Err(CuttleError::NoSuchLanguage(_))
    ));
}

#[test]
fn test_empty_manager_yields_empty_snapshot() {
    let manager = SearchManager::in_memory();

    let snapshot = manager.acquire_snapshot(None).unwrap();
    assert!(snapshot.languages().is_empty());
    assert_eq!(snapshot.doc_count().unwrap(), 0);
    assert_eq!(snapshot.facet_count().unwrap(), 0);
    manager.release(&snapshot).unwrap();
}

#[test]
fn test_snapshot_counters() {
    let manager = SearchManager::in_memory();
    manager
        .commit(&lang("en"), &batch_of(&[(1, "quartz")]))
        .unwrap();

    let a = manager.acquire_snapshot(None).unwrap();
    let b = manager.acquire_snapshot(None).unwrap();
    assert_eq!(manager.metrics().active_snapshots.get(), 2.0);

    manager.release(&a).unwrap();
    manager.release(&b).unwrap();
    assert_eq!(manager.metrics().active_snapshots.get(), 0.0);
    assert_eq!(manager.metrics().snapshots_acquired.get(), 2.0);
    assert_eq!(manager.metrics().snapshots_released.get(), 2.0);
}
