use std::{fs, path::PathBuf, time::Duration};

use phrase_rush::{
    config::AppConfig, dao::phrase_store::memory::InMemoryStore, state::game::AllocationPolicy,
};

fn scratch(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("phrase-rush-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn shipped_config_loads() {
    let config = AppConfig::load_from(&PathBuf::from("config/app.json"));
    assert_eq!(config.round_duration_secs, 45);
    assert_eq!(config.phrases_per_team, 15);
    assert_eq!(config.policy, AllocationPolicy::SharedPool);
    assert_eq!(config.tick_interval, Duration::from_secs(1));
}

#[test]
fn broken_config_falls_back_to_defaults() {
    let path = scratch("broken.json", "{ not json");
    assert_eq!(AppConfig::load_from(&path), AppConfig::default());
}

#[test]
fn shipped_content_is_consistent() {
    assert!(InMemoryStore::load_json(&PathBuf::from("config/content.json")).is_ok());
}

#[test]
fn content_with_dangling_references_is_refused() {
    let path = scratch(
        "dangling.json",
        r#"{"categories":[{"id":1,"name":"Movies"}],"phrases":[{"id":1,"text":"Jaws","category_id":2}]}"#,
    );
    assert!(InMemoryStore::load_json(&path).is_err());
}
