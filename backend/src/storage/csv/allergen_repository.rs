//! # CSV Allergen Repository
//!
//! Stores the allergen catalog (seeded roots, their sub-items and custom
//! allergens) in `allergens.csv`.
//!
//! ```csv
//! id,name,is_custom,icon,parent_id
//! milk,Milk,false,🥛,
//! cheese,Cheese,false,,milk
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::Allergen;

use super::table::{CsvRecord, CsvTable};

/// Allergen collection backed by `allergens.csv`
pub type AllergenRepository = CsvTable<Allergen>;

/// CSV record structure for allergens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllergenRow {
    id: String,
    name: String,
    is_custom: bool,
    icon: Option<String>,
    parent_id: Option<String>,
}

impl CsvRecord for Allergen {
    type Row = AllergenRow;

    fn to_row(&self) -> Result<AllergenRow> {
        Ok(AllergenRow {
            id: self.id.clone(),
            name: self.name.clone(),
            is_custom: self.is_custom,
            icon: self.icon.clone(),
            parent_id: self.parent_id.clone(),
        })
    }

    fn from_row(row: AllergenRow) -> Result<Self> {
        if row.id.is_empty() {
            return Err(anyhow::anyhow!("Allergen row has an empty id"));
        }

        Ok(Allergen {
            id: row.id,
            name: row.name,
            is_custom: row.is_custom,
            icon: row.icon.filter(|icon| !icon.is_empty()),
            parent_id: row.parent_id.filter(|parent| !parent.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::{allergen, TestEnvironment};
    use crate::storage::records::AllergenIndex;
    use crate::storage::CollectionStorage;

    async fn setup_test_repo() -> (AllergenRepository, TestEnvironment) {
        let env = TestEnvironment::new().expect("Failed to create test environment");
        let repo = AllergenRepository::new(&env.connection);
        repo.load().await.expect("Failed to load allergens");
        (repo, env)
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let (repo, _env) = setup_test_repo().await;

        let mut milk = allergen("milk", None);
        milk.icon = Some("🥛".to_string());
        repo.put(&milk).await.expect("Failed to store allergen");

        let retrieved = repo.get("milk").await.expect("Failed to get allergen");
        assert_eq!(retrieved, Some(milk));
    }

    #[tokio::test]
    async fn test_records_survive_reload() {
        let (repo, env) = setup_test_repo().await;

        let mut custom = allergen("kiwi", None);
        custom.is_custom = true;
        repo.put(&custom).await.unwrap();
        repo.put(&allergen("milk", None)).await.unwrap();
        repo.put(&allergen("cheese", Some("milk"))).await.unwrap();

        let reopened = AllergenRepository::new(&env.connection);
        assert_eq!(reopened.load().await.unwrap(), 3);

        assert_eq!(reopened.get("kiwi").await.unwrap(), Some(custom));
        assert_eq!(
            reopened.get("cheese").await.unwrap().and_then(|a| a.parent_id),
            Some("milk".to_string())
        );
        assert_eq!(reopened.get("milk").await.unwrap().unwrap().parent_id, None);
    }

    #[tokio::test]
    async fn test_query_by_parent_index() {
        let (repo, _env) = setup_test_repo().await;

        repo.put_many(&[
            allergen("milk", None),
            allergen("cheese", Some("milk")),
            allergen("butter", Some("milk")),
            allergen("tofu", Some("soy")),
        ])
        .await
        .unwrap();

        let mut ids: Vec<String> = repo
            .query_by_index(AllergenIndex::ByParent, "milk")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["butter", "cheese"]);

        let by_name = repo.query_by_index(AllergenIndex::ByName, "tofu").await.unwrap();
        assert_eq!(by_name.len(), 1);
    }

    #[tokio::test]
    async fn test_replacing_a_record_moves_its_index_entries() {
        let (repo, _env) = setup_test_repo().await;

        repo.put(&allergen("cheese", Some("milk"))).await.unwrap();
        let mut moved = allergen("cheese", Some("dairy"));
        moved.name = "Aged cheese".to_string();
        repo.put(&moved).await.unwrap();

        assert!(repo
            .query_by_index(AllergenIndex::ByParent, "milk")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.query_by_index(AllergenIndex::ByParent, "dairy").await.unwrap(),
            vec![moved]
        );
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (repo, _env) = setup_test_repo().await;
        repo.put(&allergen("sesame", None)).await.unwrap();

        assert!(repo.delete("sesame").await.unwrap());
        assert!(!repo.delete("sesame").await.unwrap());
        assert_eq!(repo.get("sesame").await.unwrap(), None);
        assert!(repo
            .query_by_index(AllergenIndex::ByName, "sesame")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_reads_before_load_are_rejected() {
        let env = TestEnvironment::new().unwrap();
        let repo = AllergenRepository::new(&env.connection);

        let err = repo.get_all().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::storage::StorageError>(),
            Some(crate::storage::StorageError::NotLoaded { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_skipped() {
        let env = TestEnvironment::new().unwrap();
        std::fs::write(
            env.base_directory().join("allergens.csv"),
            "id,name,is_custom,icon,parent_id\nmilk,Milk,false,,\n,Broken,false,,\neggs,Eggs,notabool,,\n",
        )
        .unwrap();

        let repo = AllergenRepository::new(&env.connection);
        assert_eq!(repo.load().await.unwrap(), 1);
        assert!(repo.get("milk").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_collection_unchanged() {
        let (repo, env) = setup_test_repo().await;
        repo.put(&allergen("milk", None)).await.unwrap();

        std::fs::remove_dir_all(env.base_directory()).unwrap();

        let err = repo.put(&allergen("eggs", None)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::storage::StorageError>(),
            Some(crate::storage::StorageError::WriteFailure { .. })
        ));
        assert_eq!(repo.get("eggs").await.unwrap(), None);
        assert!(repo.get("milk").await.unwrap().is_some());
    }
}
