use std::{fs, path::Path};

use serde_json::json;

use oxide_codegen::{
    conflict::{ConflictPolicy, FixedPolicy},
    deps::PatchOutcome,
    generator::{GenerateOptions, GenerationReport, Generator},
    merge::MARKER_END,
    render::{MiniJinjaRenderer, TemplateSet},
    layer::LayerKind,
    schema::{OverrideSet, RawSchema, TableOverride, VirtualColumn},
    writer::WriteAction,
};

const MANIFEST: &str = "[package]\nname = \"shop\"\nversion = \"0.1.0\"\nedition = \"2024\"\n\n[dependencies]\ntokio = { version = \"1\", features = [\"full\"] }\n";

fn schema(extra_user_column: bool) -> RawSchema {
    let mut user_columns = vec![
        json!({ "name": "id", "sql_type": "int4", "primary_key": true, "auto_increment": true }),
        json!({ "name": "email", "sql_type": "varchar(255)", "unique": true }),
        json!({ "name": "created_at", "sql_type": "timestamptz" }),
    ];
    if extra_user_column {
        user_columns.push(json!({ "name": "nickname", "sql_type": "text", "nullable": true }));
    }
    serde_json::from_value(json!({
        "tables": [
            {
                "name": "users",
                "columns": user_columns,
                "primary_keys": ["id"]
            },
            {
                "name": "posts",
                "comment": "Blog posts",
                "columns": [
                    { "name": "id", "sql_type": "int4", "primary_key": true, "auto_increment": true },
                    { "name": "user_id", "sql_type": "int4" },
                    { "name": "title", "sql_type": "text" },
                    { "name": "score", "sql_type": "numeric(10,2)", "nullable": true }
                ],
                "primary_keys": ["id"],
                "foreign_keys": [
                    {
                        "name": "fk_posts_users",
                        "column": "user_id",
                        "referenced_table": "users",
                        "referenced_column": "id"
                    }
                ]
            }
        ]
    }))
    .expect("schema json")
}

fn options(root: &Path) -> GenerateOptions {
    GenerateOptions {
        project_root: root.to_path_buf(),
        ..Default::default()
    }
}

fn generate(
    options: &GenerateOptions,
    schema: &RawSchema,
    policy: Option<ConflictPolicy>,
) -> GenerationReport {
    generate_with(options, schema, &OverrideSet::default(), policy)
}

fn generate_with(
    options: &GenerateOptions,
    schema: &RawSchema,
    overrides: &OverrideSet,
    policy: Option<ConflictPolicy>,
) -> GenerationReport {
    let templates = TemplateSet::builtin();
    let generator = Generator {
        options,
        schema,
        overrides,
        templates: &templates,
        renderer: &MiniJinjaRenderer,
    };
    match policy {
        Some(policy) => {
            let mut decider = FixedPolicy(policy);
            generator.run(Some(&mut decider)).expect("generation runs")
        }
        None => generator.run(None).expect("generation runs"),
    }
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap_or_else(|err| panic!("read {rel}: {err}"))
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("Cargo.toml"), MANIFEST).expect("write manifest");
    dir
}

#[test]
fn first_run_creates_every_layer() {
    let dir = project();
    let root = dir.path();
    let report = generate(&options(root), &schema(false), None);

    assert!(report.failed_tables.is_empty());
    assert!(report.skipped_tables.is_empty());
    assert_eq!(report.count(WriteAction::Create), report.steps.len());
    for rel in [
        "src/entities/mod.rs",
        "src/entities/prelude.rs",
        "src/entities/posts.rs",
        "src/entities/users.rs",
        "src/dto/mod.rs",
        "src/dto/users_dto.rs",
        "src/vo/posts_vo.rs",
        "src/services/users_service.rs",
        "src/routes/posts.rs",
        ".oxide-codegen/ledger.json",
    ] {
        assert!(root.join(rel).is_file(), "{rel} should exist");
    }

    assert_eq!(
        read(root, "src/entities/mod.rs"),
        "pub mod posts;\npub mod prelude;\npub mod users;\n"
    );
    assert_eq!(read(root, "src/dto/mod.rs"), "pub mod posts_dto;\npub mod users_dto;\n");

    let posts = read(root, "src/entities/posts.rs");
    assert!(posts.contains("table_name = \"posts\""));
    assert!(posts.contains("belongs_to = \"crate::entities::users::Entity\""));
    let users = read(root, "src/entities/users.rs");
    assert!(users.contains("has_many = \"crate::entities::posts::Entity\""));
}

#[test]
fn second_run_changes_nothing() {
    let dir = project();
    let root = dir.path();
    let options = options(root);
    generate(&options, &schema(false), None);
    let entity_index = read(root, "src/entities/mod.rs");
    let prelude = read(root, "src/entities/prelude.rs");
    let manifest = read(root, "Cargo.toml");

    let report = generate(&options, &schema(false), None);

    assert_eq!(report.count(WriteAction::Unchanged), report.steps.len());
    assert_eq!(read(root, "src/entities/mod.rs"), entity_index);
    assert_eq!(read(root, "src/entities/prelude.rs"), prelude);
    assert_eq!(read(root, "Cargo.toml"), manifest);
    assert_eq!(report.dependencies, Some(PatchOutcome::UpToDate));
}

#[test]
fn entity_edits_outside_markers_survive_regeneration() {
    let dir = project();
    let root = dir.path();
    let options = options(root);
    generate(&options, &schema(false), None);

    let path = root.join("src/entities/users.rs");
    let mut edited = read(root, "src/entities/users.rs");
    edited.push_str("\nimpl Model {\n    pub fn display_name(&self) -> &str {\n        &self.email\n    }\n}\n");
    fs::write(&path, &edited).expect("edit entity");

    let report = generate(&options, &schema(true), None);

    let merged = read(root, "src/entities/users.rs");
    assert!(merged.contains("pub fn display_name(&self)"));
    assert!(merged.contains("pub nickname: Option<String>,"));
    let end = merged.find(MARKER_END).expect("end marker kept");
    assert!(merged[..end].contains("pub nickname"));
    let step = report
        .steps
        .iter()
        .find(|step| step.path == Path::new("src/entities/users.rs"))
        .expect("users entity planned");
    assert_eq!(step.action, WriteAction::Merge);
}

fn users_override(table_override: TableOverride) -> OverrideSet {
    let mut overrides = OverrideSet::default();
    overrides.tables.insert("users".to_string(), table_override);
    overrides
}

#[test]
fn entity_traits_can_change_between_runs() {
    let dir = project();
    let root = dir.path();
    let options = options(root);
    generate(&options, &schema(false), None);

    let path = root.join("src/entities/users.rs");
    let mut edited = read(root, "src/entities/users.rs");
    edited.push_str("
impl Model {
    pub fn is_admin(&self) -> bool {
        false
    }
}
");
    fs::write(&path, &edited).expect("edit entity");

    let overrides = users_override(TableOverride {
        traits: [(LayerKind::Entity, vec!["ToSchema".to_string()])].into(),
        ..Default::default()
    });
    generate_with(&options, &schema(false), &overrides, None);

    let merged = read(root, "src/entities/users.rs");
    let end = merged.find(MARKER_END).expect("end marker kept");
    assert!(merged[..end].contains("DeriveEntityModel, serde::Serialize, serde::Deserialize, utoipa::ToSchema)"));
    assert!(!merged.contains("\nuse serde::"));
    assert!(!merged.contains("\nuse utoipa::"));
    assert!(merged.contains("pub fn is_admin(&self)"));

    generate(&options, &schema(false), None);
    let reverted = read(root, "src/entities/users.rs");
    assert!(!reverted.contains("ToSchema"));
    assert!(reverted.contains("pub fn is_admin(&self)"));
}

#[test]
fn virtual_columns_are_ignored_by_the_database_layers() {
    let dir = project();
    let root = dir.path();
    let overrides = users_override(TableOverride {
        virtual_columns: vec![VirtualColumn {
            name: "display_name".to_string(),
            rust_type: "String".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    });

    let report = generate_with(&options(root), &schema(false), &overrides, None);

    assert!(report.failed_tables.is_empty());
    let entity = read(root, "src/entities/users.rs");
    assert!(entity.contains("    #[sea_orm(ignore)]\n    pub display_name: String,"));
    let service = read(root, "src/services/users_service.rs");
    assert!(service.contains("email: Set(input.email)"));
    assert!(!service.contains("display_name"));
}

#[test]
fn hand_edited_sources_are_skipped_without_a_decision() {
    let dir = project();
    let root = dir.path();
    let options = options(root);
    generate(&options, &schema(false), None);

    let path = root.join("src/dto/users_dto.rs");
    fs::write(&path, "// mine now\n").expect("edit dto");

    let report = generate(&options, &schema(false), None);

    assert_eq!(read(root, "src/dto/users_dto.rs"), "// mine now\n");
    assert_eq!(report.count(WriteAction::Skip), 1);
}

#[test]
fn backup_policy_keeps_a_copy_of_the_edited_file() {
    let dir = project();
    let root = dir.path();
    let options = options(root);
    generate(&options, &schema(false), None);
    let generated = read(root, "src/services/users_service.rs");

    fs::write(root.join("src/services/users_service.rs"), "// custom\n").expect("edit service");
    let report = generate(&options, &schema(false), Some(ConflictPolicy::Backup));

    assert_eq!(report.count(WriteAction::BackupAndOverwrite), 1);
    assert_eq!(read(root, "src/services/users_service.rs.bak"), "// custom\n");
    assert_eq!(read(root, "src/services/users_service.rs"), generated);
}

#[test]
fn pristine_files_follow_the_schema_when_enabled() {
    let dir = project();
    let root = dir.path();
    let mut options = options(root);
    generate(&options, &schema(false), None);
    let before = read(root, "src/dto/users_dto.rs");

    options.overwrite_pristine = true;
    let report = generate(&options, &schema(true), None);

    let after = read(root, "src/dto/users_dto.rs");
    assert_ne!(before, after);
    assert!(after.contains("nickname"));
    assert_eq!(report.count(WriteAction::Skip), 0);
}

#[test]
fn hand_added_modules_stay_in_the_index() {
    let dir = project();
    let root = dir.path();
    let options = options(root);
    generate(&options, &schema(false), None);

    fs::write(
        root.join("src/dto/mod.rs"),
        "pub mod custom_dto;\npub mod users_dto;\n",
    )
    .expect("edit index");
    generate(&options, &schema(false), None);

    assert_eq!(
        read(root, "src/dto/mod.rs"),
        "pub mod custom_dto;\npub mod posts_dto;\npub mod users_dto;\n"
    );
}

#[test]
fn files_written_before_a_failure_are_recorded() {
    let dir = project();
    let root = dir.path();
    fs::create_dir_all(root.join("src")).expect("create src");
    fs::write(root.join("src/routes"), "not a directory\n").expect("block routes dir");

    let options = options(root);
    let templates = TemplateSet::builtin();
    let overrides = OverrideSet::default();
    let schema = schema(false);
    let generator = Generator {
        options: &options,
        schema: &schema,
        overrides: &overrides,
        templates: &templates,
        renderer: &MiniJinjaRenderer,
    };
    assert!(generator.run(None).is_err());

    let ledger: serde_json::Value =
        serde_json::from_str(&read(root, ".oxide-codegen/ledger.json")).expect("ledger json");
    let files = &ledger["files"];
    assert!(files.get("src/entities/users.rs").is_some());
    assert!(files.get("src/dto/users_dto.rs").is_some());
    assert!(files.get("src/services/users_service.rs").is_none());

    fs::remove_file(root.join("src/routes")).expect("unblock routes dir");
    let report = generate(&options, &schema, None);
    assert_eq!(report.count(WriteAction::Skip), 0);
    assert!(root.join("src/routes/posts.rs").is_file());
}

#[test]
fn manifest_gains_the_crates_generated_code_uses() {
    let dir = project();
    let root = dir.path();
    let report = generate(&options(root), &schema(false), None);

    let Some(PatchOutcome::Patched { added }) = report.dependencies else {
        panic!("manifest should be patched");
    };
    for name in ["axum", "chrono", "rust_decimal", "sea-orm", "serde"] {
        assert!(added.iter().any(|added| added == name), "{name} missing");
    }
    let manifest = read(root, "Cargo.toml");
    assert!(manifest.contains("tokio = { version = \"1\", features = [\"full\"] }"));
    assert!(manifest.contains("sea-orm = {"));
}

#[test]
fn dry_run_touches_nothing() {
    let dir = project();
    let root = dir.path();
    let mut options = options(root);
    options.dry_run = true;

    let report = generate(&options, &schema(false), None);

    assert!(report.dry_run);
    assert!(!report.steps.is_empty());
    assert!(!root.join("src").exists());
    assert!(!root.join(".oxide-codegen").exists());
    assert_eq!(read(root, "Cargo.toml"), MANIFEST);
    assert!(matches!(report.dependencies, Some(PatchOutcome::Pending { .. })));
}
