use std::io::Write;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 23] = [
    "QDRANT_URL",
    "QDRANT_TIMEOUT",
    "EMBED_URL",
    "EMBED_DIM",
    "EMBED_TIMEOUT",
    "EMBED_QUERY_TIMEOUT",
    "EMBED_CACHE_SIZE",
    "LLM_URL",
    "LLM_TIMEOUT",
    "LLM_MAX_TOKENS",
    "LLM_TEMPERATURE",
    "COLLECTION",
    "CHUNK_SIZE",
    "OVERLAP",
    "BATCH_SIZE",
    "MAX_FILE_SIZE",
    "PRUNE_STALE",
    "MAX_CONTEXT_LENGTH",
    "RELEVANCE_THRESHOLD",
    "RETRY_ATTEMPTS",
    "RETRY_BASE_DELAY_MS",
    "RECON_BIND",
    "RECON_PORT",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn defaults_when_file_missing() {
    clear_env();
    let config = Config::load(Path::new("/nonexistent/recon.toml")).unwrap();
    assert_eq!(config.qdrant.url, "http://localhost:6334");
    assert_eq!(config.embedding.url, "http://localhost:8081/embed");
    assert_eq!(config.embedding.dimension, 384);
    assert_eq!(config.llm.url, "http://localhost:8080");
    assert_eq!(config.index.collection, "sovereignty-arch");
    assert_eq!(config.index.chunk_size, 400);
    assert_eq!(config.index.overlap, 60);
    assert_eq!(config.index.batch_size, 32);
    assert_eq!(config.retrieval.max_context_length, 4000);
    assert!((config.retrieval.relevance_threshold - 0.7).abs() < f32::EPSILON);
    assert_eq!(config.server.port, 7000);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn parse_partial_toml() {
    clear_env();
    let file = write_config(
        r#"
[index]
collection = "my-repo"
chunk_size = 200
overlap = 20

[retrieval]
relevance_threshold = 0.5

[server]
port = 9000
"#,
    );
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.index.collection, "my-repo");
    assert_eq!(config.index.chunk_size, 200);
    assert_eq!(config.index.overlap, 20);
    assert_eq!(config.index.batch_size, 32);
    assert!((config.retrieval.relevance_threshold - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.bind, "0.0.0.0");
}

#[test]
#[serial]
fn invalid_toml_is_an_error() {
    clear_env();
    let file = write_config("[index\nchunk_size = ");
    assert!(Config::load(file.path()).is_err());
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let file = write_config("[index]\ncollection = \"from-file\"\n");
    unsafe {
        std::env::set_var("COLLECTION", "from-env");
        std::env::set_var("CHUNK_SIZE", "128");
        std::env::set_var("EMBED_URL", "http://embedder:9000/embed");
        std::env::set_var("RELEVANCE_THRESHOLD", "0.25");
        std::env::set_var("PRUNE_STALE", "false");
    }
    let config = Config::load(file.path()).unwrap();
    clear_env();

    assert_eq!(config.index.collection, "from-env");
    assert_eq!(config.index.chunk_size, 128);
    assert_eq!(config.embedding.url, "http://embedder:9000/embed");
    assert!((config.retrieval.relevance_threshold - 0.25).abs() < f32::EPSILON);
    assert!(!config.index.prune_stale);
}

#[test]
#[serial]
fn invalid_env_value_is_ignored() {
    clear_env();
    unsafe { std::env::set_var("BATCH_SIZE", "lots") };
    let config = Config::load(Path::new("/nonexistent/recon.toml")).unwrap();
    clear_env();
    assert_eq!(config.index.batch_size, 32);
}

#[test]
fn validate_rejects_overlap_not_below_chunk_size() {
    let mut config = Config::default();
    config.index.chunk_size = 50;
    config.index.overlap = 50;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("index.overlap"));
}

#[test]
fn validate_rejects_zero_batch() {
    let mut config = Config::default();
    config.index.batch_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_default_k_above_max() {
    let mut config = Config::default();
    config.retrieval.default_k = 21;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_nan_threshold() {
    let mut config = Config::default();
    config.retrieval.relevance_threshold = f32::NAN;
    assert!(config.validate().is_err());
}

#[test]
fn ingest_config_maps_sections() {
    let mut config = Config::default();
    config.index.collection = "c".into();
    config.index.extensions = vec!["RS".into()];
    let ingest = config.ingest_config();
    assert_eq!(ingest.collection, "c");
    assert_eq!(ingest.dimension, 384);
    assert_eq!(ingest.chunker.chunk_size, 400);
    assert!(ingest.discovery.extensions.contains(".rs"));
    assert_eq!(ingest.loader.max_file_size, 2_000_000);
}

#[test]
fn generation_params_follow_llm_section() {
    let mut config = Config::default();
    config.llm.max_tokens = 128;
    let params = config.generation_params();
    assert_eq!(params.max_tokens, 128);
    assert_eq!(params.stop, ["Human:", "Question:"]);
}

#[test]
fn cli_path_wins_over_default() {
    let path = resolve_config_path(Some(Path::new("custom.toml")));
    assert_eq!(path, PathBuf::from("custom.toml"));
}

#[test]
#[serial]
fn shipped_sample_config_is_valid() {
    clear_env();
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/recon.toml");
    let config = Config::load(&path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.qdrant.url, "http://localhost:6334");
    assert_eq!(config.index.batch_size, 32);
    assert_eq!(config.index.extensions, Config::default().index.extensions);
}
