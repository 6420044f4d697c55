mod common;

use common::{allergen, at, reaction, trial, TestStore};
use shared::{AllergenStatus, Severity};

#[tokio::test]
async fn milk_is_testing_until_every_sub_item_is_safe() {
    let t = TestStore::initialized().await;
    let store = &t.store;

    for day in 1..=3 {
        store
            .add_food_trial(trial("Whole milk", &["cow-milk"], at(2025, 1, day, 8, 0)))
            .await
            .unwrap();
    }

    assert_eq!(store.status_of("cow-milk").unwrap(), AllergenStatus::Safe);
    assert_eq!(store.status_of("cheese").unwrap(), AllergenStatus::Testing);
    assert_eq!(store.status_of("milk").unwrap(), AllergenStatus::Testing);
    assert_eq!(store.trial_count_of("milk").unwrap(), 3);
}

#[tokio::test]
async fn one_reaction_marks_peanuts_even_with_a_single_trial() {
    let t = TestStore::initialized().await;
    let store = &t.store;

    let peanut_trial = store
        .add_food_trial(trial("Peanut puffs", &["roasted-peanut"], at(2025, 2, 1, 9, 0)))
        .await
        .unwrap();
    store
        .add_reaction(reaction(&peanut_trial.id, Severity::Moderate))
        .await
        .unwrap();

    assert_eq!(store.trial_count_of("roasted-peanut").unwrap(), 1);
    assert_eq!(store.status_of("roasted-peanut").unwrap(), AllergenStatus::Reaction);
    assert_eq!(store.status_of("peanuts").unwrap(), AllergenStatus::Reaction);
    assert_eq!(store.reactions_for_allergen("roasted-peanut").unwrap().len(), 1);
}

#[tokio::test]
async fn leaf_status_follows_trial_count_and_reactions() {
    let t = TestStore::loaded().await;
    let store = &t.store;
    store.add_allergen(allergen("kiwi", None)).await.unwrap();

    let mut trial_ids = Vec::new();
    for day in 1..=5 {
        let added = store
            .add_food_trial(trial("Kiwi", &["kiwi"], at(2025, 3, day, 8, 0)))
            .await
            .unwrap();
        trial_ids.push(added.id);

        let expected = if day < 3 {
            AllergenStatus::Testing
        } else {
            AllergenStatus::Safe
        };
        assert_eq!(store.status_of("kiwi").unwrap(), expected, "after {} trials", day);
    }

    store
        .add_reaction(reaction(&trial_ids[0], Severity::Mild))
        .await
        .unwrap();
    assert_eq!(store.status_of("kiwi").unwrap(), AllergenStatus::Reaction);
}

#[tokio::test]
async fn root_safe_when_all_sub_items_safe_and_counts_sum() {
    let t = TestStore::loaded().await;
    let store = &t.store;
    store.add_allergen(allergen("sesame", None)).await.unwrap();
    store.add_allergen(allergen("tahini", Some("sesame"))).await.unwrap();
    store.add_allergen(allergen("hummus", Some("sesame"))).await.unwrap();

    for day in 1..=3 {
        store
            .add_food_trial(trial("Hummus toast", &["tahini", "hummus"], at(2025, 4, day, 8, 0)))
            .await
            .unwrap();
    }
    // Direct trials of the root are not part of its status or count
    store
        .add_food_trial(trial("Sesame bar", &["sesame"], at(2025, 4, 9, 8, 0)))
        .await
        .unwrap();

    assert_eq!(store.status_of("sesame").unwrap(), AllergenStatus::Safe);
    assert_eq!(
        store.trial_count_of("sesame").unwrap(),
        store.trial_count_of("tahini").unwrap() + store.trial_count_of("hummus").unwrap()
    );
    assert_eq!(store.trial_count_of("sesame").unwrap(), 6);
}

#[tokio::test]
async fn deleting_a_reacted_trial_degrades_gracefully() {
    let t = TestStore::initialized().await;
    let store = &t.store;

    let eggs = store
        .add_food_trial(trial("Egg yolk", &["egg-yolk"], at(2025, 5, 1, 8, 0)))
        .await
        .unwrap();
    let logged = store
        .add_reaction(reaction(&eggs.id, Severity::Severe))
        .await
        .unwrap();
    assert_eq!(store.status_of("eggs").unwrap(), AllergenStatus::Reaction);

    assert!(store.delete_food_trial(&eggs.id).await.unwrap());
    assert!(!store.delete_food_trial(&eggs.id).await.unwrap());

    assert_eq!(store.status_of("egg-yolk").unwrap(), AllergenStatus::Testing);
    assert_eq!(store.status_of("eggs").unwrap(), AllergenStatus::Testing);
    assert!(store.reactions_for_allergen("egg-yolk").unwrap().is_empty());
    // The orphaned reaction itself is still there
    assert!(store.get_reaction(&logged.id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleted_allergen_falls_back_to_raw_id() {
    let t = TestStore::loaded().await;
    let store = &t.store;
    store.add_allergen(allergen("lupin", None)).await.unwrap();
    store
        .add_food_trial(trial("Lupin flour", &["lupin"], at(2025, 6, 1, 8, 0)))
        .await
        .unwrap();

    assert!(store.delete_allergen("lupin").await.unwrap());
    assert_eq!(store.allergen_label("lupin").unwrap(), "lupin");
    assert_eq!(store.trials_for_allergen("lupin").unwrap().len(), 1);
    assert!(!store.is_parent_allergen("lupin").unwrap());
}

#[tokio::test]
async fn hierarchy_reads_over_the_seeded_catalog() {
    let t = TestStore::initialized().await;
    let store = &t.store;

    let roots = store.root_allergens().unwrap();
    assert_eq!(roots.len(), 9);
    assert_eq!(roots[0].id, "milk");
    assert!(roots.iter().all(|root| root.parent_id.is_none()));

    let milk_items = store.sub_items_of("milk").unwrap();
    assert!(milk_items.iter().any(|item| item.id == "cheese"));
    assert_eq!(store.parent_of("cheese").unwrap().map(|p| p.id), Some("milk".to_string()));
    assert_eq!(store.parent_of("milk").unwrap(), None);
    assert!(store.is_parent_allergen("milk").unwrap());
    assert_eq!(store.allergen_label("milk").unwrap(), "🥛 Milk");
    assert_eq!(store.find_allergens_by_name("Cheese").await.unwrap().len(), 1);
}
