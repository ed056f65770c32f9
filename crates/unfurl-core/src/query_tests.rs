use std::sync::Arc;

use unfurl_dom::Document;
use unfurl_protocols::Selector;

use super::*;

fn button() -> Selector {
    Selector::new("button").unwrap()
}

#[tokio::test]
async fn test_find_all_without_shadow_roots() {
    let doc = Document::new();
    let root = doc.root();
    let a = doc.element(root, "button", &[]).unwrap();
    let div = doc.element(root, "div", &[]).unwrap();
    let b = doc.element(div, "button", &[]).unwrap();

    let query = TreeQuery::new(Arc::new(doc), 8);
    let found = query.find_all(&root, &button()).await.unwrap();
    assert_eq!(found, vec![a, b]);
}

#[tokio::test]
async fn test_find_all_descends_into_nested_shadow_roots() {
    let doc = Document::new();
    let root = doc.root();
    let outer_host = doc.element(root, "comment-tree", &[]).unwrap();
    let outer = doc.attach_shadow(outer_host).unwrap();
    let a = doc.element(outer, "button", &[]).unwrap();
    let inner_host = doc.element(outer, "comment-thread", &[]).unwrap();
    let inner = doc.attach_shadow(inner_host).unwrap();
    let b = doc.element(inner, "button", &[]).unwrap();
    let light = doc.element(root, "button", &[]).unwrap();

    let query = TreeQuery::new(Arc::new(doc), 8);
    let found = query.find_all(&root, &button()).await.unwrap();
    assert_eq!(found.len(), 3);
    for node in [a, b, light] {
        assert!(found.contains(&node));
    }
}

#[tokio::test]
async fn test_find_all_respects_depth_cap() {
    let doc = Document::new();
    let root = doc.root();
    let host = doc.element(root, "div", &[]).unwrap();
    let shadow = doc.attach_shadow(host).unwrap();
    let nested_host = doc.element(shadow, "div", &[]).unwrap();
    let nested = doc.attach_shadow(nested_host).unwrap();
    let shallow = doc.element(shadow, "button", &[]).unwrap();
    doc.element(nested, "button", &[]).unwrap();

    let query = TreeQuery::new(Arc::new(doc), 1);
    let found = query.find_all(&root, &button()).await.unwrap();
    assert_eq!(found, vec![shallow]);
}

#[tokio::test]
async fn test_find_all_on_empty_tree() {
    let doc = Document::new();
    let root = doc.root();
    let query = TreeQuery::new(Arc::new(doc), 8);
    assert!(query.find_all(&root, &button()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_all_propagates_invalid_selector() {
    let doc = Document::new();
    let root = doc.root();
    let query = TreeQuery::new(Arc::new(doc), 8);
    let bad = Selector::new("button:hover").unwrap();
    assert!(query.find_all(&root, &bad).await.is_err());
}
