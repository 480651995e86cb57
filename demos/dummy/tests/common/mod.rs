//! Scenarios shared by every dummy client.

#![allow(dead_code)]

use commandable_core::{ConfigParams, FilterParams, PagingParams};
use commandable_example_dummy::{Dummy, DummyClient};

pub fn local_config(port: u16) -> ConfigParams {
    ConfigParams::from_tuples([
        ("connection.protocol", "http".to_string()),
        ("connection.host", "localhost".to_string()),
        ("connection.port", port.to_string()),
    ])
}

/// Create two dummies, read, update and delete one of them.
pub async fn crud_operations(client: &dyn DummyClient) {
    let created = client
        .create_dummy(None, Dummy::new("Key 1", "Content 1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.key, "Key 1");
    assert_eq!(created.content, "Content 1");
    let id = created.id.clone().unwrap();
    assert!(!id.is_empty());

    let second = client
        .create_dummy(None, Dummy::new("Key 2", "Content 2"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.key, "Key 2");

    let page = client
        .get_dummies(None, None, Some(PagingParams::new(None, None, true)))
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.total, Some(2));

    let filter = FilterParams::new().with("key", "Key 2");
    let page = client.get_dummies(None, Some(filter), None).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].content, "Content 2");

    let updated = client
        .update_dummy(None, Dummy { content: "Updated Content 1".to_string(), ..created.clone() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id.as_deref(), Some(id.as_str()));
    assert_eq!(updated.content, "Updated Content 1");

    let found = client.get_dummy_by_id(None, &id).await.unwrap().unwrap();
    assert_eq!(found.content, "Updated Content 1");

    let deleted = client.delete_dummy(None, &id).await.unwrap().unwrap();
    assert_eq!(deleted.id.as_deref(), Some(id.as_str()));

    assert_eq!(client.get_dummy_by_id(None, &id).await.unwrap(), None);
    assert_eq!(client.delete_dummy(None, &id).await.unwrap(), None);
}

/// Updating an id nobody created gives nothing back.
pub async fn update_missing(client: &dyn DummyClient) {
    let ghost = Dummy {
        id: Some("no-such-dummy".to_string()),
        ..Dummy::new("Key", "Content")
    };
    assert_eq!(client.update_dummy(None, ghost).await.unwrap(), None);
}

/// Controller errors reach the caller with category, status and correlation id.
pub async fn exception_propagation(client: &dyn DummyClient) {
    let err = client.raise_exception(Some("123")).await.unwrap_err();
    assert_eq!(err.code(), "TEST_ERROR");
    assert_eq!(err.status(), 404);
    assert_eq!(err.message(), "Dummy error in controller!");
    assert_eq!(err.correlation_id(), Some("123"));
}

pub async fn ping_and_correlation(client: &dyn DummyClient) {
    assert!(client.ping(None).await.unwrap());
    assert_eq!(
        client.check_correlation_id(Some("test_cor_id")).await.unwrap(),
        "test_cor_id"
    );
}
