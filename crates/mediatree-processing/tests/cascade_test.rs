//! End-to-end runs of the variant pipeline over configured contexts.

#![cfg(feature = "image")]

use async_trait::async_trait;
use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};
use mediatree_core::{
    Context, Media, MediaContent, MediaTreeConfig, MediaTreeError, Result, Variant, VariantStatus,
};
use mediatree_processing::{
    ProcessedFile, Provider, ProviderRegistry, ProviderSupport, VariantPipeline,
};
use mediatree_storage::{FilesystemMap, NamingStrategy, NamingStrategyRegistry};
use serde_json::{json, Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const CONFIG: &str = r#"{
    "filesystems": [
        {"name": "memory", "backend": "memory", "base_url": "http://media.test"}
    ],
    "naming_strategies": [
        {"name": "slug", "kind": "slug"}
    ],
    "contexts": [
        {
            "name": "pictures",
            "provider": "image",
            "filesystem": "memory",
            "naming_strategy": "slug",
            "variants": {
                "default": {"mode": "resize", "process": {"width": 400}},
                "medium": {"parent": "default", "process": {"width": 200}},
                "thumb": {"parent": "medium", "mode": "crop", "process": {"width": 50, "height": 50}}
            }
        },
        {
            "name": "documents",
            "provider": "trace",
            "filesystem": "memory",
            "naming_strategy": "slug",
            "variants": {
                "thumb": {"parent": "medium"},
                "medium": {"parent": "default", "process": {"skip": true}},
                "default": {}
            }
        },
        {
            "name": "broken",
            "provider": "trace",
            "filesystem": "memory",
            "naming_strategy": "slug",
            "variants": {
                "default": {},
                "thumb": {"parent": "missing"}
            }
        },
        {
            "name": "cased",
            "provider": "trace",
            "filesystem": "memory",
            "naming_strategy": "slug",
            "variants": {
                "default": {},
                "Small": {"parent": "default"},
                "small": {"parent": "default"}
            }
        },
        {
            "name": "failing",
            "provider": "trace",
            "filesystem": "memory",
            "naming_strategy": "slug",
            "variants": {
                "default": {},
                "preview": {"parent": "default"},
                "print": {"parent": "preview", "process": {"fail": true}}
            }
        }
    ]
}"#;

/// Appends the variant name to whatever its input file holds.
struct TraceProvider {
    support: ProviderSupport,
}

impl TraceProvider {
    fn new() -> Self {
        Self {
            support: ProviderSupport::new(Map::new()),
        }
    }
}

#[async_trait]
impl Provider for TraceProvider {
    fn name(&self) -> &str {
        "trace"
    }

    fn content_type(&self) -> mediatree_core::ContentType {
        mediatree_core::ContentType::File
    }

    fn support(&self) -> &ProviderSupport {
        &self.support
    }

    fn support_mut(&mut self) -> &mut ProviderSupport {
        &mut self.support
    }

    fn validate_content(&self, content: &MediaContent) -> bool {
        content.as_path().map(Path::is_file).unwrap_or(false)
    }

    async fn prepare(&self, media: &mut Media, _context: &Context) -> Result<()> {
        media.set_metadata("traced", true);
        Ok(())
    }

    async fn process(
        &self,
        _media: &Media,
        variant: &Variant,
        source: Option<&Path>,
    ) -> Result<Option<ProcessedFile>> {
        if variant.option("fail") == Some(&json!(true)) {
            return Err(MediaTreeError::processing(
                format!("Variant \"{}\" failed", variant.name()),
                anyhow::anyhow!("fail flag set"),
            ));
        }
        if variant.option("skip") == Some(&json!(true)) {
            return Ok(None);
        }
        let input = match source {
            Some(path) => tokio::fs::read_to_string(path).await?,
            None => String::new(),
        };
        let output = self.support.new_temp_path("txt");
        tokio::fs::write(&output, format!("{}|{}", input, variant.name())).await?;
        Ok(Some(ProcessedFile::new(output, "text/plain", "txt")))
    }

    fn render(
        &self,
        _media: &Media,
        _variant: &Variant,
        url: Option<&str>,
        _options: &Map<String, JsonValue>,
    ) -> String {
        url.unwrap_or_default().to_string()
    }
}

struct Fixture {
    config: MediaTreeConfig,
    pipeline: VariantPipeline,
    providers: ProviderRegistry,
    scratch: TempDir,
}

impl Fixture {
    async fn new() -> Self {
        let config = MediaTreeConfig::from_json_str(CONFIG).unwrap();
        let pipeline = VariantPipeline::new(
            FilesystemMap::from_config(&config.filesystems).await,
            NamingStrategyRegistry::from_config(&config.naming_strategies),
        );
        let scratch = TempDir::new().unwrap();
        let providers = ProviderRegistry::with_defaults()
            .await
            .with_temp_dir(scratch.path());
        providers
            .register("trace", || Box::new(TraceProvider::new()))
            .await;
        Self {
            config,
            pipeline,
            providers,
            scratch,
        }
    }

    fn context(&self, name: &str) -> Context {
        Context::new(self.config.context(name).cloned().unwrap()).unwrap()
    }

    fn write_source(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.scratch.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    async fn stored(&self, key: &str) -> Vec<u8> {
        let storage = self.pipeline.filesystems().get("memory").unwrap();
        storage.read(key).await.unwrap()
    }
}

#[tokio::test]
async fn test_image_cascade_stores_every_variant() {
    let fixture = Fixture::new().await;
    let context = fixture.context("pictures");
    let provider = fixture.providers.create_for(&context).await.unwrap();

    let source = fixture.scratch.path().join("sunset.png");
    RgbaImage::from_pixel(800, 400, Rgba([200, 80, 20, 255]))
        .save_with_format(&source, ImageFormat::Png)
        .unwrap();
    let mut media = Media::new("pictures", MediaContent::File(source));

    let report = fixture
        .pipeline
        .save(&mut media, &context, provider.as_ref())
        .await
        .unwrap();

    assert_eq!(
        report.ready().collect::<Vec<_>>(),
        vec!["default", "medium", "thumb"]
    );
    assert_eq!(media.name, "sunset");
    assert_eq!(media.metadata_value("width"), Some(&json!(800)));

    let expected = [
        ("default", (400, 200)),
        ("medium", (200, 100)),
        ("thumb", (50, 50)),
    ];
    for (name, dimensions) in expected {
        let record = media.variant(name).unwrap();
        let key = record.storage_key.clone().unwrap();
        assert_eq!(key, format!("pictures/{}/sunset_{}.png", media.id, name));
        assert_eq!(
            record.url.as_deref(),
            Some(format!("http://media.test/{}", key).as_str())
        );
        let bytes = fixture.stored(&key).await;
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.dimensions(), dimensions, "variant {}", name);
    }

    let temp_files = provider.temp_files();
    assert_eq!(temp_files.len(), 3);
    assert!(temp_files.iter().all(|path| !path.exists()));

    let html = fixture
        .pipeline
        .render(&media, &context, provider.as_ref(), Some("thumb"), &Map::new())
        .unwrap();
    assert_eq!(
        html,
        format!(
            r#"<img src="http://media.test/pictures/{}/sunset_thumb.png" width="50" height="50" alt="sunset" />"#,
            media.id
        )
    );
}

#[tokio::test]
async fn test_skipped_variant_hands_its_input_down() {
    let fixture = Fixture::new().await;
    let context = fixture.context("documents");
    let provider = fixture.providers.create_for(&context).await.unwrap();
    let source = fixture.write_source("seed.txt", b"seed");
    let mut media = Media::new("documents", MediaContent::File(source)).with_name("seed");

    let report = fixture
        .pipeline
        .save(&mut media, &context, provider.as_ref())
        .await
        .unwrap();

    assert_eq!(
        report.variants,
        vec![
            ("default".to_string(), VariantStatus::Ready),
            ("medium".to_string(), VariantStatus::Skipped),
            ("thumb".to_string(), VariantStatus::Ready),
        ]
    );
    assert_eq!(media.metadata_value("traced"), Some(&json!(true)));
    assert_eq!(media.variant("medium").unwrap().storage_key, None);
    let default_key = format!("documents/{}/seed_default.txt", media.id);
    let thumb_key = format!("documents/{}/seed_thumb.txt", media.id);
    assert_eq!(fixture.stored(&default_key).await, b"seed|default");
    assert_eq!(fixture.stored(&thumb_key).await, b"seed|default|thumb");
}

#[tokio::test]
async fn test_unknown_parent_fails_before_any_write() {
    let fixture = Fixture::new().await;
    let context = fixture.context("broken");
    let provider = fixture.providers.create_for(&context).await.unwrap();
    let source = fixture.write_source("seed.txt", b"seed");
    let mut media = Media::new("broken", MediaContent::File(source)).with_name("seed");

    let err = fixture
        .pipeline
        .save(&mut media, &context, provider.as_ref())
        .await
        .unwrap_err();

    match err {
        MediaTreeError::UnknownParent { variant, parent } => {
            assert_eq!(variant, "thumb");
            assert_eq!(parent, "missing");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(media.variants.is_empty());
    assert!(media.metadata_value("traced").is_none());
    let storage = fixture.pipeline.filesystems().get("memory").unwrap();
    let key = format!("broken/{}/seed_default.txt", media.id);
    assert!(!storage.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_failure_mid_tree_still_cleans_temp_files() {
    let fixture = Fixture::new().await;
    let context = fixture.context("failing");
    let provider = fixture.providers.create_for(&context).await.unwrap();
    let source = fixture.write_source("seed.txt", b"seed");
    let mut media = Media::new("failing", MediaContent::File(source.clone())).with_name("seed");

    let err = fixture
        .pipeline
        .save(&mut media, &context, provider.as_ref())
        .await
        .unwrap_err();

    assert!(matches!(err, MediaTreeError::Processing { .. }));
    assert!(err.to_string().contains("print"));
    let temp_files = provider.temp_files();
    assert_eq!(temp_files.len(), 2);
    assert!(temp_files.iter().all(|path| !path.exists()));
    assert!(source.exists());
}

#[tokio::test]
async fn test_remove_deletes_stored_variants() {
    let fixture = Fixture::new().await;
    let context = fixture.context("documents");
    let provider = fixture.providers.create_for(&context).await.unwrap();
    let source = fixture.write_source("seed.txt", b"seed");
    let mut media = Media::new("documents", MediaContent::File(source)).with_name("seed");
    fixture
        .pipeline
        .save(&mut media, &context, provider.as_ref())
        .await
        .unwrap();

    let keys: Vec<String> = media
        .variants
        .values()
        .filter_map(|record| record.storage_key.clone())
        .collect();
    assert_eq!(keys.len(), 2);

    fixture.pipeline.remove(&mut media, &context).await.unwrap();

    assert!(media.variants.is_empty());
    let storage = fixture.pipeline.filesystems().get("memory").unwrap();
    for key in keys {
        assert!(!storage.exists(&key).await.unwrap());
    }
}

#[tokio::test]
async fn test_same_named_media_do_not_share_storage() {
    let fixture = Fixture::new().await;
    let context = fixture.context("documents");
    let storage = fixture.pipeline.filesystems().get("memory").unwrap();

    let mut saved = Vec::new();
    for contents in ["first", "second"] {
        let provider = fixture.providers.create_for(&context).await.unwrap();
        let source = fixture.write_source(&format!("{}.txt", contents), contents.as_bytes());
        let mut media = Media::new("documents", MediaContent::File(source)).with_name("photo");
        fixture
            .pipeline
            .save(&mut media, &context, provider.as_ref())
            .await
            .unwrap();
        saved.push(media);
    }

    let first_key = saved[0].variant("default").unwrap().storage_key.clone().unwrap();
    let second_key = saved[1].variant("default").unwrap().storage_key.clone().unwrap();
    assert_ne!(first_key, second_key);
    assert_eq!(fixture.stored(&first_key).await, b"first|default");
    assert_eq!(fixture.stored(&second_key).await, b"second|default");

    fixture.pipeline.remove(&mut saved[0], &context).await.unwrap();

    assert!(!storage.exists(&first_key).await.unwrap());
    assert_eq!(fixture.stored(&second_key).await, b"second|default");
}

#[tokio::test]
async fn test_variant_names_differing_in_case_are_stored_apart() {
    let fixture = Fixture::new().await;
    let context = fixture.context("cased");
    let provider = fixture.providers.create_for(&context).await.unwrap();
    let source = fixture.write_source("seed.txt", b"seed");
    let mut media = Media::new("cased", MediaContent::File(source)).with_name("seed");

    fixture
        .pipeline
        .save(&mut media, &context, provider.as_ref())
        .await
        .unwrap();

    let upper = media.variant("Small").unwrap().storage_key.clone().unwrap();
    let lower = media.variant("small").unwrap().storage_key.clone().unwrap();
    assert_ne!(upper, lower);
    assert_eq!(fixture.stored(&upper).await, b"seed|default|Small");
    assert_eq!(fixture.stored(&lower).await, b"seed|default|small");
}

/// Ignores the variant, so every variant of a media lands on one key.
struct FlatNaming;

impl NamingStrategy for FlatNaming {
    fn generate(&self, media: &Media, _variant: &Variant, extension: &str) -> String {
        format!("{}/{}.{}", media.context, media.name, extension)
    }
}

#[tokio::test]
async fn test_colliding_storage_keys_are_rejected() {
    let fixture = Fixture::new().await;
    let pipeline = VariantPipeline::new(
        FilesystemMap::from_config(&fixture.config.filesystems).await,
        NamingStrategyRegistry::new().with("slug", Arc::new(FlatNaming)),
    );
    let context = fixture.context("documents");
    let provider = fixture.providers.create_for(&context).await.unwrap();
    let source = fixture.write_source("seed.txt", b"seed");
    let mut media = Media::new("documents", MediaContent::File(source)).with_name("seed");

    let err = pipeline
        .save(&mut media, &context, provider.as_ref())
        .await
        .unwrap_err();

    match err {
        MediaTreeError::InvalidConfiguration(message) => {
            assert!(message.contains("\"default\""));
            assert!(message.contains("\"thumb\""));
            assert!(message.contains("documents/seed.txt"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(media.variants.is_empty());
    assert!(provider.temp_files().iter().all(|path| !path.exists()));
}

#[tokio::test]
async fn test_tree_is_built_once_per_context() {
    let fixture = Fixture::new().await;
    let context = fixture.context("documents");
    let first = context.build_variant_tree().unwrap();

    for _ in 0..2 {
        let provider = fixture.providers.create_for(&context).await.unwrap();
        let source = fixture.write_source("seed.txt", b"seed");
        let mut media = Media::new("documents", MediaContent::File(source)).with_name("seed");
        fixture
            .pipeline
            .save(&mut media, &context, provider.as_ref())
            .await
            .unwrap();
    }

    assert!(std::sync::Arc::ptr_eq(&first, &context.build_variant_tree().unwrap()));
}
