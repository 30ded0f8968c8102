//! Full protection runs against an in-memory asset store.

use std::cell::Cell;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rstest::rstest;

use shroud_app::{
    FixedOperator, KeyRecord, LocalKeyStore, MeshStatus, ProtectContext, ProtectError,
    ProtectReport, Protector, SceneManifest, Severity, ShaderLocker, ShaderStatus, ShroudConfig,
};
use shroud_core::encoder::{OFFSET_A_CHANNEL, OFFSET_B_CHANNEL};
use shroud_core::material::{Material, ShaderRef, FALLBACK_HIDDEN, FALLBACK_TAG};
use shroud_core::math::{Vec2, Vec3};
use shroud_core::mesh::{Mesh, SubMesh};
use shroud_shader::decode::DECODE_FILE_NAME;
use shroud_shader::SENTINEL;
use shroud_vfs::MemoryProvider;

const TOON_SHADER: &str = r#"Shader "Shroud/Toon"
{
    SubShader
    {
        Pass
        {
            CGPROGRAM
            #pragma vertex vert
            #include "UnityCG.cginc"
            #include "ToonInput.cginc"

v2f vert (appdata v)
{
    v2f o;
    o.pos = UnityObjectToClipPos(v.vertex);
    return o;
}
            ENDCG
        }
    }
}
"#;

const TOON_INPUT: &str = r#"struct appdata
{
    float4 vertex : POSITION;
    float3 normal : NORMAL;
    float2 uv : TEXCOORD0;
};
"#;

const OUTPUT_DIR: &str = "Shroud/Generated";

fn material_json(name: &str, shader_path: &str, shader_name: &str) -> String {
    Material::new(name, ShaderRef::new(shader_path, shader_name))
        .to_json()
        .unwrap()
}

/// Two quads, one per submesh.
fn body_mesh() -> Mesh {
    let positions = vec![
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 2.0, 0.0),
        Vec3::new(-1.0, 2.0, 0.0),
        Vec3::new(-1.0, 2.0, 1.0),
        Vec3::new(1.0, 2.0, 1.0),
        Vec3::new(1.0, 3.0, 1.0),
        Vec3::new(-1.0, 3.0, 1.0),
    ];
    Mesh::new("Body")
        .with_positions(positions)
        .with_normals(vec![Vec3::z(); 8])
        .with_uv(0, vec![Vec2::new(0.5, 0.5); 8])
        .with_submesh(SubMesh::new(vec![0, 1, 2, 0, 2, 3]))
        .with_submesh(SubMesh::new(vec![4, 5, 6, 4, 6, 7]))
        .with_computed_bounds()
}

fn avatar_store() -> MemoryProvider {
    let store = MemoryProvider::new();
    store.insert("Shaders/Toon.shader", TOON_SHADER);
    store.insert("Shaders/ToonInput.cginc", TOON_INPUT);
    store.insert(
        "Materials/Skin.mat.json",
        material_json("Skin", "Shaders/Toon.shader", "Shroud/Toon"),
    );
    store.insert(
        "Materials/Eyes.mat.json",
        material_json("Eyes", "Shaders/Toon.shader", "Shroud/Toon"),
    );
    store.insert(
        "Materials/Plain.mat.json",
        material_json("Plain", "Shaders/Standard.shader", "Standard"),
    );
    store.insert("Meshes/Body.mesh.json", body_mesh().to_json().unwrap());
    store.insert(
        "Meshes/Prop.mesh.json",
        body_mesh().to_json().unwrap(),
    );
    store
}

fn avatar_manifest(free_bits: usize) -> SceneManifest {
    SceneManifest::from_json(&format!(
        r#"{{
            "name": "Avatar",
            "renderers": [
                {{"name": "Body", "mesh": "Meshes/Body.mesh.json",
                  "materials": ["Materials/Skin.mat.json", null]}},
                {{"name": "Prop", "mesh": "Meshes/Prop.mesh.json",
                  "materials": ["Materials/Plain.mat.json"]}},
                {{"name": "Skirt", "mesh": "Meshes/Body.mesh.json",
                  "materials": ["Materials/Skin.mat.json"], "cloth": true}}
            ],
            "parameters": {{"capacity": 256, "used": {}}}
        }}"#,
        256 - free_bits
    ))
    .unwrap()
}

fn config() -> ShroudConfig {
    ShroudConfig::from_toml(
        r#"
[protect]
distort_ratio = 1.0
key_length = 8
ignored_materials = ["Materials/Eyes.mat.json"]
owner_id = "avtr_1"
"#,
    )
    .unwrap()
}

fn run(store: &MemoryProvider, config: &ShroudConfig, manifest: &SceneManifest) -> ProtectReport {
    let mut ctx = ProtectContext::new();
    Protector::new(store, config)
        .protect(manifest, &mut StdRng::seed_from_u64(7), &mut ctx)
        .unwrap()
}

fn load_material(store: &MemoryProvider, path: &str) -> Material {
    Material::from_json(&store.text(path).unwrap()).unwrap()
}

#[test]
fn protects_materials_and_encodes_meshes() {
    let store = avatar_store();
    let report = run(&store, &config(), &avatar_manifest(64));

    assert_eq!(report.key_length(), 8);
    assert_eq!(report.encoded_meshes(), 1);
    assert_eq!(report.failures(), 0);

    let skin = load_material(&store, "Materials/Skin.mat.json");
    assert_eq!(skin.shader.path, "Shaders/Toon_Protected.shader");
    assert_eq!(skin.shader.name, "Shroud/Toon/Protected");
    assert_eq!(
        skin.tags.get(FALLBACK_TAG).map(String::as_str),
        Some(FALLBACK_HIDDEN)
    );

    let patched = store.text("Shaders/Toon_Protected.shader").unwrap();
    assert!(patched.starts_with(SENTINEL));
    assert!(patched.contains("ToonInput_Protected.cginc"));
    assert!(store.text(&format!("Shaders/{DECODE_FILE_NAME}")).is_some());
    assert!(store.text("Shaders/ToonInput_Protected.cginc").is_some());

    // Sources are never modified.
    assert_eq!(store.text("Shaders/Toon.shader").unwrap(), TOON_SHADER);
    assert_eq!(
        load_material(&store, "Materials/Plain.mat.json").shader.name,
        "Standard"
    );
}

#[test]
fn encoded_mesh_carries_offsets() {
    let store = avatar_store();
    let report = run(&store, &config(), &avatar_manifest(64));

    let body = report
        .meshes
        .iter()
        .find(|m| m.renderer == "Body")
        .unwrap();
    let MeshStatus::Encoded { output, report: encode } = &body.status else {
        panic!("body was not encoded: {:?}", body.status);
    };
    assert_eq!(output, &format!("{OUTPUT_DIR}/Meshes/Body_Protected.mesh.json"));
    // The empty slot is dropped, so the second submesh clamps to the skin.
    assert_eq!(encode.clamped_submeshes, vec![1]);
    assert_eq!(encode.displaced, 8);

    let source = body_mesh();
    let encoded = Mesh::from_json(&store.text(output).unwrap()).unwrap();
    assert_eq!(encoded.name, source.name);
    assert_eq!(encoded.submeshes, source.submeshes);
    assert_eq!(encoded.uv[0], source.uv[0]);
    for v in 0..encoded.vertex_count() {
        assert_ne!(encoded.uv[OFFSET_A_CHANNEL][v], Vec2::zeros());
        assert_ne!(encoded.uv[OFFSET_B_CHANNEL][v], Vec2::zeros());
    }
}

#[test]
fn renderers_are_rebound() {
    let store = avatar_store();
    let report = run(&store, &config(), &avatar_manifest(64));

    let scene_path = report.scene.clone().unwrap();
    assert_eq!(scene_path, format!("{OUTPUT_DIR}/Avatar_Protected.scene.json"));
    let rebound = SceneManifest::from_json(&store.text(&scene_path).unwrap()).unwrap();

    let body = &rebound.renderers[0];
    assert_eq!(
        body.mesh.as_deref(),
        Some("Shroud/Generated/Meshes/Body_Protected.mesh.json")
    );
    assert_eq!(
        body.materials,
        vec![Some("Materials/Skin.mat.json".to_owned())]
    );

    // Nothing on the prop is patchable, so it keeps its mesh.
    let prop = &rebound.renderers[1];
    assert_eq!(prop.mesh.as_deref(), Some("Meshes/Prop.mesh.json"));

    let skirt = &rebound.renderers[2];
    assert!(skirt.cloth);
    assert_eq!(skirt.mesh.as_deref(), Some("Meshes/Body.mesh.json"));
}

#[rstest]
#[case("Prop", "no protected materials")]
#[case("Skirt", "cloth simulation")]
fn skipped_renderers(#[case] renderer: &str, #[case] reason: &str) {
    let store = avatar_store();
    let report = run(&store, &config(), &avatar_manifest(64));

    let outcome = report
        .meshes
        .iter()
        .find(|m| m.renderer == renderer)
        .unwrap();
    match &outcome.status {
        MeshStatus::Skipped(why) => assert_eq!(why, reason),
        other => panic!("expected {renderer} to be skipped, got {other:?}"),
    }
}

#[test]
fn shared_mesh_and_shader_are_processed_once() {
    let store = avatar_store();
    let manifest = SceneManifest::from_json(
        r#"{
            "name": "Twins",
            "renderers": [
                {"name": "Left", "mesh": "Meshes/Body.mesh.json",
                 "materials": ["Materials/Skin.mat.json"]},
                {"name": "Right", "mesh": "Meshes/Body.mesh.json",
                 "materials": ["Materials/Skin.mat.json"]}
            ],
            "parameters": {"capacity": 256, "used": 0}
        }"#,
    )
    .unwrap();
    let report = run(&store, &config(), &manifest);

    assert!(matches!(report.meshes[0].status, MeshStatus::Encoded { .. }));
    assert!(matches!(report.meshes[1].status, MeshStatus::Reused { .. }));
    let protected = report
        .shaders
        .iter()
        .filter(|s| matches!(s.status, ShaderStatus::Protected { .. }))
        .count();
    assert_eq!(protected, 1);
    assert!(matches!(
        report.shaders[1].status,
        ShaderStatus::AlreadyProtected
    ));
}

#[test]
fn same_named_meshes_keep_separate_outputs() {
    let store = avatar_store();
    store.insert("Body/Mesh.mesh.json", body_mesh().to_json().unwrap());
    let mut hair = body_mesh();
    hair.name = "HairMesh".into();
    store.insert("Hair/Mesh.mesh.json", hair.to_json().unwrap());
    let manifest = SceneManifest::from_json(
        r#"{
            "name": "Split",
            "renderers": [
                {"name": "Body", "mesh": "Body/Mesh.mesh.json",
                 "materials": ["Materials/Skin.mat.json"]},
                {"name": "Hair", "mesh": "Hair/Mesh.mesh.json",
                 "materials": ["Materials/Skin.mat.json"]}
            ],
            "parameters": {"capacity": 256, "used": 0}
        }"#,
    )
    .unwrap();
    let report = run(&store, &config(), &manifest);

    assert_eq!(report.encoded_meshes(), 2);
    let rebound =
        SceneManifest::from_json(&store.text(report.scene.as_deref().unwrap()).unwrap()).unwrap();
    let outputs: Vec<&str> = rebound
        .renderers
        .iter()
        .map(|r| r.mesh.as_deref().unwrap())
        .collect();
    assert_eq!(
        outputs,
        vec![
            "Shroud/Generated/Body/Mesh_Protected.mesh.json",
            "Shroud/Generated/Hair/Mesh_Protected.mesh.json",
        ]
    );
    for (renderer, expected) in rebound.renderers.iter().zip(["Body", "HairMesh"]) {
        let mesh = Mesh::from_json(&store.text(renderer.mesh.as_deref().unwrap()).unwrap()).unwrap();
        assert_eq!(mesh.name, expected, "{} bound to the wrong mesh", renderer.name);
    }
}

#[test]
fn ignored_and_additional_materials() {
    let store = avatar_store();
    let mut config = config();
    config
        .protect
        .additional_materials
        .push("Materials/Eyes.mat.json".into());
    config.protect.ignored_materials.clear();

    let manifest = SceneManifest::from_json(
        r#"{"name": "Extras", "parameters": {"capacity": 256, "used": 0}}"#,
    )
    .unwrap();
    let report = run(&store, &config, &manifest);

    assert_eq!(report.protected_materials(), 1);
    assert!(load_material(&store, "Materials/Eyes.mat.json").is_protected());

    // With the default ignore list the same material is left alone.
    let store = avatar_store();
    let mut config = self::config();
    config
        .protect
        .additional_materials
        .push("Materials/Eyes.mat.json".into());
    let report = run(&store, &config, &manifest);
    assert_eq!(report.protected_materials(), 0);
    assert!(!load_material(&store, "Materials/Eyes.mat.json").is_protected());
}

#[test]
fn short_budget_without_consent_changes_nothing() {
    let store = avatar_store();
    let before: Vec<String> = store.paths();
    let config = config();
    let mut ctx = ProtectContext::new();

    let result = Protector::new(&store, &config).protect(
        &avatar_manifest(4),
        &mut StdRng::seed_from_u64(1),
        &mut ctx,
    );

    assert!(matches!(
        result,
        Err(ProtectError::Cancelled {
            free: 4,
            requested: 8
        })
    ));
    assert_eq!(store.paths(), before);
}

#[test]
fn short_budget_with_consent_uses_shorter_key() {
    let store = avatar_store();
    let config = config();
    let mut ctx = ProtectContext::new();

    let report = Protector::new(&store, &config)
        .with_operator(FixedOperator {
            accept_short_key: true,
        })
        .protect(&avatar_manifest(4), &mut StdRng::seed_from_u64(1), &mut ctx)
        .unwrap();

    assert_eq!(report.key_length(), 4);
    assert_eq!(report.bits.len(), 4);
}

#[test]
fn keys_are_written_to_every_profile() {
    let store = avatar_store();
    let params = MemoryProvider::new();
    params.insert("usr_a/avtr_other", b"{}".to_vec());
    params.insert("usr_b/avtr_other", b"{}".to_vec());

    let mut config = config();
    config.params.insert("BitKey0".into(), "Blink".into());
    let mut ctx = ProtectContext::new();
    let mut protector = Protector::new(&store, &config);
    for profile in LocalKeyStore::discover(&params).unwrap() {
        protector = protector.with_key_store(profile);
    }
    let report = protector
        .protect(&avatar_manifest(64), &mut StdRng::seed_from_u64(3), &mut ctx)
        .unwrap();

    assert_eq!(report.keys_written, 2);
    assert_eq!(report.bit_names[0], "Blink");
    for profile in ["usr_a", "usr_b"] {
        let record =
            KeyRecord::from_json(&params.text(&format!("{profile}/avtr_1")).unwrap()).unwrap();
        let values = record.values();
        for (name, bit) in report.bit_names.iter().zip(&report.bits) {
            assert_eq!(values.get(name), Some(bit));
        }
    }

    // The generated decode routine reads the renamed parameter.
    let decode = store.text(&format!("Shaders/{DECODE_FILE_NAME}")).unwrap();
    assert!(decode.contains("Blink"));
}

#[test]
fn missing_owner_is_a_warning() {
    let store = avatar_store();
    let mut config = config();
    config.protect.owner_id = None;
    let mut ctx = ProtectContext::new();

    let report = Protector::new(&store, &config)
        .protect(&avatar_manifest(64), &mut StdRng::seed_from_u64(5), &mut ctx)
        .unwrap();

    assert_eq!(report.keys_written, 0);
    assert!(ctx
        .audit()
        .entries()
        .iter()
        .any(|e| e.severity == Severity::Warning && e.message.contains("owner id")));
}

/// Reports every shader as lockable and refuses to lock.
struct StubbornLocker {
    attempts: Cell<usize>,
}

impl ShaderLocker for StubbornLocker {
    fn can_lock(&self, _material: &Material) -> bool {
        true
    }

    fn is_locked(&self, _material: &Material) -> bool {
        false
    }

    fn set_locked(&self, _material: &mut Material, _locked: bool) -> bool {
        self.attempts.set(self.attempts.get() + 1);
        false
    }
}

#[test]
fn unlockable_shaders_are_skipped() {
    let store = avatar_store();
    let config = config();
    let mut ctx = ProtectContext::new();
    let locker = StubbornLocker {
        attempts: Cell::new(0),
    };

    let report = Protector::new(&store, &config)
        .with_locker(&locker)
        .protect(&avatar_manifest(64), &mut StdRng::seed_from_u64(9), &mut ctx)
        .unwrap();

    assert!(locker.attempts.get() > 0);
    assert_eq!(report.protected_materials(), 0);
    assert_eq!(report.encoded_meshes(), 0);
    assert!(ctx.audit().count(Severity::Error) > 0);
    assert!(store.text("Shaders/Toon_Protected.shader").is_none());
}
