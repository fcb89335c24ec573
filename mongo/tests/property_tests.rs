//! Property-based tests for the connection manager and accessor.

use std::sync::Arc;

use proptest::prelude::*;
use sdk_mongo::{
    BaseDao, ConnectionConfig, ConnectionSettings, DaoConfig, DbClient, DbClientProvider,
    Document, DocumentStore, FindOptions, MemoryStore,
};
use test_utils::fixtures::{env_lookup, sample_db_env};
use test_utils::{document_strategy, name_strategy, password_strategy, username_strategy};

fn config() -> ConnectionConfig {
    ConnectionConfig::resolve_with(ConnectionSettings::default(), env_lookup(sample_db_env()))
        .unwrap()
}

fn client() -> Arc<DbClient> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    Arc::new(DbClient::new(&config(), store))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_database_handles_compare_by_name(a in name_strategy(), b in name_strategy()) {
        tokio_test::block_on(async {
            let client = client();
            let first = client.connect(&a).await.unwrap();
            let again = client.connect(&a).await.unwrap();
            let other = client.connect(&b).await.unwrap();

            prop_assert_eq!(first.name(), a.as_str());
            prop_assert_eq!(&first, &again);
            prop_assert_eq!(first == other, a == b);
            Ok(())
        })?;
    }

    #[test]
    fn prop_provider_ignores_later_configs(
        username in username_strategy(),
        password in password_strategy(),
    ) {
        let provider = DbClientProvider::with_store(Arc::new(MemoryStore::new()));
        let first = provider.create(&config()).unwrap();
        let later = ConnectionConfig::resolve_with(
            ConnectionSettings::default()
                .with_username(username)
                .with_password(password)
                .with_host("other.example.net"),
            |_| None,
        )
        .unwrap();
        let second = provider.create(&later).unwrap();
        prop_assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn prop_connection_config_debug_hides_password(
        username in username_strategy(),
        password in password_strategy(),
    ) {
        let config = ConnectionConfig::resolve_with(
            ConnectionSettings::default()
                .with_username(username.clone())
                .with_password(password.clone())
                .with_host("db.example.net"),
            |_| None,
        )
        .unwrap();
        let uri = config.connection_uri();
        let prefix = format!("mongodb+srv://{username}:");
        prop_assert!(uri.starts_with(&prefix));
        prop_assert!(uri.ends_with("?authSource=admin&w=majority&retryWrites=true&ssl=true"));
        let config_debug = format!("{config:?}");
        prop_assert!(!config_debug.contains(&password));
    }

    #[test]
    fn prop_insert_preserves_fields_and_stamps(fields in document_strategy()) {
        tokio_test::block_on(async {
            let dao = BaseDao::new(client(), "app", "items", DaoConfig::default());
            let mut input = fields.clone();
            input.insert("_id".to_string(), "fixed".into());
            dao.insert_one(input).await.unwrap();

            let mut filter = Document::new();
            filter.insert("_id".to_string(), "fixed".into());
            let stored = dao.find_one(filter, FindOptions::default()).await.unwrap().unwrap();

            for (key, value) in &fields {
                prop_assert_eq!(stored.get(key), Some(value));
            }
            prop_assert!(stored.get("createdAt").is_some());
            prop_assert_eq!(stored.get("createdAt"), stored.get("updatedAt"));
            Ok(())
        })?;
    }

    #[test]
    fn prop_delete_many_reports_whether_anything_was_removed(
        docs in proptest::collection::vec(document_strategy(), 0..10),
    ) {
        tokio_test::block_on(async {
            let dao = BaseDao::new(client(), "app", "items", DaoConfig::default());
            let expected = docs.len() as u64;
            if !docs.is_empty() {
                prop_assert_eq!(dao.insert_many(docs).await.unwrap(), expected);
            }
            prop_assert_eq!(dao.count(None).await.unwrap(), expected);
            prop_assert_eq!(dao.delete_many(Document::new()).await.unwrap(), expected > 0);
            prop_assert_eq!(dao.count(None).await.unwrap(), 0);
            Ok(())
        })?;
    }
}
