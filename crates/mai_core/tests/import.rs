//! End-to-end imports into an in-memory scene.

use std::path::{Path, PathBuf};

use mai_core::ma::ImportCommand;
use mai_core::{import_file, import_from_string, DiagnosticKind, ImportConfig, ImportReport, MemoryScene, SceneBackend};
use mai_math::{Color, Vec2, Vec3};

/// Helper to get test asset path (works from any working directory)
fn test_asset_path(relative: &str) -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let crate_root = Path::new(&manifest_dir);
    // Go up to workspace root
    let workspace_root = crate_root.parent().unwrap().parent().unwrap();
    workspace_root.join(relative)
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn kind_count(report: &ImportReport, kind: DiagnosticKind) -> usize {
    report.diagnostics.iter().filter(|d| d.kind == kind).count()
}

const QUAD: &str = r#"//Maya ASCII 2020 scene
requires maya "2020";
createNode transform -n "pPlane1";
	setAttr ".t" -type "double3" 0 2 0 ;
createNode mesh -n "pPlaneShape1" -p "pPlane1";
	setAttr -k off ".v";
	setAttr ".uvst[0].uvsn" -type "string" "map1";
	setAttr -s 4 ".uvst[0].uvsp[0:3]" -type "float2" 0 0 1 0 0 1 1 1;
	setAttr ".cuvs" -type "string" "map1";
	setAttr -s 4 ".vt[0:3]"  -0.5 -0.5 0 0.5 -0.5 0 -0.5 0.5 0 0.5 0.5 0;
	setAttr -s 4 ".ed[0:3]"  0 1 0 0 2 0 1 3 0 2 3 0;
	setAttr -s 4 ".n[0:3]" -type "float3"  0 0 1 0 0 1 0 0 1 0 0 1;
	setAttr -s 1 -ch 4 ".fc[0]" -type "polyFaces"
		f 4 0 2 -4 -2
		mu 0 4 0 1 3 2;
	setAttr ".pt[3]" -type "float3" 0 0 0.5;
connectAttr "pPlaneShape1.iog" ":initialShadingGroup.dsm" -na;
"#;

#[test]
fn test_end_to_end_quad() {
    let mut scene = MemoryScene::with_defaults();
    let report = import_from_string(QUAD, &mut scene, &ImportConfig::default()).unwrap();

    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(report.transaction.meshes, vec!["pPlaneShape1"]);
    assert_eq!(report.transaction.transforms, vec!["|pPlane1"]);
    assert_eq!(scene.full_path("pPlaneShape1").as_deref(), Some("|pPlane1|pPlaneShape1"));

    let mesh = scene.mesh("pPlaneShape1").unwrap();
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.face_count(), 1);
    assert_eq!(mesh.faces[0], vec![0, 1, 3, 2]);

    let normals = mesh.normals.as_ref().unwrap();
    assert_eq!(normals.len(), 4);
    assert!(normals.iter().all(|n| (*n - Vec3::Z).length() < 1e-6));

    let map1 = mesh.uv_set("map1").unwrap();
    assert_eq!(map1.uvs.len(), 4);
    assert_eq!(map1.counts, vec![4]);
    assert_eq!(map1.ids, vec![0, 1, 3, 2]);

    // Tweaks land after construction
    assert_eq!(mesh.positions[3], Vec3::new(0.5, 0.5, 0.5));
    assert_eq!(scene.face_shading_group("pPlaneShape1", 0), Some("initialShadingGroup"));
    assert_eq!(scene.node("pPlane1").unwrap().attr("t"), Some(vec!["0", "2", "0"]));
}

#[test]
fn test_fixture_two_materials() {
    init_logging();
    let mut scene = MemoryScene::with_defaults();
    let path = test_asset_path("assets/two_materials.ma");
    let report = import_file(&path, &mut scene, &ImportConfig::default()).unwrap();
    let transaction = &report.transaction;

    assert_eq!(transaction.meshes, vec!["pCubeShape1"]);
    assert_eq!(transaction.transforms, vec!["|pCube1"]);
    assert_eq!(transaction.shaders, vec!["red", "blue"]);
    assert_eq!(transaction.shading_groups, vec!["redSG", "blueSG"]);
    assert_eq!(
        transaction.others,
        vec!["materialInfo1", "materialInfo2", "groupId1", "groupId2"]
    );
    assert!(!scene.exists("persp"));
    assert!(!scene.exists("uiConfigurationScriptNode"));

    // The shader builder already linked each shader to its group
    assert_eq!(kind_count(&report, DiagnosticKind::AlreadyConnected), 2);
    assert_eq!(report.diagnostics.len(), 2);
    assert_eq!(transaction.connections.len(), 14);

    let mesh = scene.mesh("pCubeShape1").unwrap();
    assert_eq!(mesh.vertex_count(), 8);
    assert_eq!(mesh.face_count(), 6);
    assert_eq!(mesh.edges.len(), 12);
    assert_eq!(mesh.uv_set("map1").unwrap().uvs.len(), 14);
    assert_eq!(mesh.uv_set("map1").unwrap().ids.len(), 24);
    assert!((mesh.size() - 3.0_f32.sqrt()).abs() < 1e-5);

    assert_eq!(scene.node("red").unwrap().attr("c"), Some(vec!["1", "0", "0"]));
    assert_eq!(scene.node_type("blue").as_deref(), Some("blinn"));
}

#[test]
fn test_face_order_follows_signed_edges() {
    let mut scene = MemoryScene::with_defaults();
    import_file(test_asset_path("assets/two_materials.ma"), &mut scene, &ImportConfig::default()).unwrap();

    let mesh = scene.mesh("pCubeShape1").unwrap();
    // Non-negative ids start at each edge's first vertex
    assert_eq!(mesh.faces[5], vec![6, 0, 2, 4]);
    // Negative ids flip only their own position
    assert_eq!(mesh.faces[0], vec![0, 1, 3, 2]);
    assert_eq!(mesh.faces[3], vec![6, 7, 1, 0]);
    assert_eq!(mesh.faces[4], vec![1, 7, 5, 3]);
}

#[test]
fn test_material_ranges_route_faces() {
    let mut scene = MemoryScene::with_defaults();
    import_file(test_asset_path("assets/two_materials.ma"), &mut scene, &ImportConfig::default()).unwrap();

    for face in 0..4 {
        assert_eq!(scene.face_shading_group("pCubeShape1", face), Some("redSG"));
    }
    for face in 4..6 {
        assert_eq!(scene.face_shading_group("pCubeShape1", face), Some("blueSG"));
    }
}

#[test]
fn test_name_uniqueness_across_imports() {
    let mut scene = MemoryScene::with_defaults();
    let config = ImportConfig::default();
    let path = test_asset_path("assets/two_materials.ma");

    let first = import_file(&path, &mut scene, &config).unwrap();
    let second = import_file(&path, &mut scene, &config).unwrap();

    assert_eq!(second.transaction.meshes, vec!["pCubeShape2"]);
    assert_eq!(second.transaction.transforms, vec!["|pCube2"]);
    for name in second.transaction.node_names() {
        assert!(
            !first.transaction.node_names().any(|n| n == name),
            "{} created twice",
            name
        );
        assert!(scene.exists(name));
    }

    // Existing shader pairs are reused rather than duplicated
    assert!(second.transaction.shaders.is_empty());
    assert_eq!(scene.face_shading_group("pCubeShape2", 0), Some("redSG"));
    assert_eq!(scene.face_shading_group("pCubeShape2", 5), Some("blueSG"));
    assert_eq!(scene.face_shading_group("pCubeShape1", 5), Some("blueSG"));
}

#[test]
fn test_shaders_duplicated_without_reuse() {
    let mut scene = MemoryScene::with_defaults();
    let config = ImportConfig {
        reuse_existing_shaders: false,
        ..Default::default()
    };
    let path = test_asset_path("assets/two_materials.ma");

    import_file(&path, &mut scene, &config).unwrap();
    let second = import_file(&path, &mut scene, &config).unwrap();

    assert_eq!(second.transaction.shaders, vec!["red1", "blue1"]);
    assert_eq!(second.transaction.shading_groups, vec!["redSG1", "blueSG1"]);
    assert_eq!(scene.face_shading_group("pCubeShape2", 0), Some("redSG1"));
    assert_eq!(scene.face_shading_group("pCubeShape1", 0), Some("redSG"));
}

#[test]
fn test_connection_idempotence() {
    let mut scene = MemoryScene::with_defaults();
    let config = ImportConfig::default();
    let content = r#"connectAttr "lambert1.msg" ":defaultShaderList1.s" -na;
connectAttr ":time1.o" "lambert1.ihi";
"#;

    let first = import_from_string(content, &mut scene, &config).unwrap();
    assert_eq!(first.transaction.connections.len(), 2);
    assert!(first.diagnostics.is_empty());

    let second = import_from_string(content, &mut scene, &config).unwrap();
    assert!(second.transaction.connections.is_empty());
    assert_eq!(kind_count(&second, DiagnosticKind::AlreadyConnected), 2);
    assert_eq!(second.diagnostics.len(), 2);
}

#[test]
fn test_connection_skip_rules() {
    let mut scene = MemoryScene::with_defaults();
    scene.create_node("displayLayer", "defaultRenderLayer", None).unwrap();
    let content = r#"createNode transform -n "a1";
createNode transform -n "b1";
connectAttr "defaultRenderLayer.msg" "a1.rlio[0]";
connectAttr ":defaultRenderingList1.msg" "a1.ihi";
connectAttr "a1.midLayerParent" "b1.ihi";
connectAttr "ghost1.msg" "b1.ihi";
connectAttr "a1.msg" "b1.ihi";
"#;
    let report = import_from_string(content, &mut scene, &ImportConfig::default()).unwrap();

    assert_eq!(report.transaction.connections.len(), 1);
    assert_eq!(report.transaction.connections[0].source, "a1.msg");
    assert_eq!(kind_count(&report, DiagnosticKind::MissingNode), 1);
    assert_eq!(report.diagnostics.len(), 1);
}

#[test]
fn test_same_node_connection_is_established() {
    let mut scene = MemoryScene::with_defaults();
    let config = ImportConfig::default();
    let content = r#"createNode transform -n "pPlane1";
connectAttr "pPlane1.tx" "pPlane1.ty";
connectAttr "|pPlane1.sx" "|pPlane1.sy";
"#;

    let first = import_from_string(content, &mut scene, &config).unwrap();
    assert!(first.diagnostics.is_empty(), "{:?}", first.diagnostics);
    assert_eq!(first.transaction.connections.len(), 2);
    assert!(scene.is_connected("pPlane1.tx", "pPlane1.ty"));
    assert!(scene.is_connected("pPlane1.sx", "pPlane1.sy"));

    // Both plugs follow the rename of the second copy
    let second = import_from_string(content, &mut scene, &config).unwrap();
    assert_eq!(second.transaction.connections.len(), 2);
    assert!(scene.is_connected("pPlane2.tx", "pPlane2.ty"));
    assert!(scene.is_connected("pPlane2.sx", "pPlane2.sy"));

    second.transaction.undo(&mut scene);
    assert!(!scene.exists("pPlane2"));
    assert!(scene.is_connected("pPlane1.tx", "pPlane1.ty"));
}

const DAG_MEMBERSHIP: &str = r#"createNode transform -n "pPlane1";
createNode mesh -n "pPlaneShape1" -p "pPlane1";
	setAttr -s 2 ".iog[0].og";
	setAttr ".iog[0].og[0].gcl" -type "componentList" 1 "f[0]";
	setAttr ".iog[0].og[1].gcl" -type "componentList" 1 "f[1]";
	setAttr -s 6 ".vt[0:5]" 0 0 0 1 0 0 2 0 0 0 1 0 1 1 0 2 1 0;
	setAttr -s 7 ".ed[0:6]" 0 1 0 1 2 0 0 3 0 1 4 0 2 5 0 3 4 0 4 5 0;
	setAttr -s 2 ".fc[0:1]" -type "polyFaces" f 4 0 3 -6 -3 f 4 1 4 -7 -4;
createNode lambert -n "red";
createNode shadingEngine -n "redSG";
createNode lambert -n "blue";
createNode shadingEngine -n "blueSG";
connectAttr "red.oc" "redSG.ss";
connectAttr "blue.oc" "blueSG.ss";
connectAttr "|pPlane1|pPlaneShape1.iog.og[0]" "redSG.dsm" -na;
connectAttr "|pPlane1|pPlaneShape1.iog.og[1]" "|blueSG.dsm" -na;
"#;

#[test]
fn test_dag_path_memberships_route_faces() {
    let mut scene = MemoryScene::with_defaults();
    let config = ImportConfig::default();

    let first = import_from_string(DAG_MEMBERSHIP, &mut scene, &config).unwrap();
    assert_eq!(scene.face_shading_group("pPlaneShape1", 0), Some("redSG"));
    assert_eq!(scene.face_shading_group("pPlaneShape1", 1), Some("blueSG"));
    // Memberships are handled, never replayed as generic links
    assert!(
        first.transaction.connections.iter().all(|c| !c.source.contains("iog")),
        "{:?}",
        first.transaction.connections
    );
    assert_eq!(kind_count(&first, DiagnosticKind::MissingNode), 0);

    let second = import_from_string(DAG_MEMBERSHIP, &mut scene, &config).unwrap();
    assert_eq!(second.transaction.meshes, vec!["pPlaneShape2"]);
    assert_eq!(scene.face_shading_group("pPlaneShape2", 0), Some("redSG"));
    assert_eq!(scene.face_shading_group("pPlaneShape2", 1), Some("blueSG"));
    assert_eq!(kind_count(&second, DiagnosticKind::MissingNode), 0);
}

const SPLIT_STREAMS: &str = r#"createNode transform -n "pPlane1";
createNode mesh -n "pPlaneShape1" -p "pPlane1";
	setAttr -s 6 ".vt";
	setAttr ".vt[0:2]" 0 0 0 1 0 0 2 0 0;
	setAttr ".vt[3:5]" 0 1 0 1 1 0 2 1 0;
	setAttr -s 7 ".ed";
	setAttr ".ed[0:3]" 0 1 0 1 2 0 0 3 0 1 4 0;
	setAttr ".ed[4:6]" 2 5 0 3 4 0 4 5 0;
	setAttr -s 6 ".n";
	setAttr ".n[0:2]" 0 0 1 0 0 1 0 0 1;
	setAttr ".n[3:5]" 0 0 1 0 0 1 0 0 1;
	setAttr -s 2 ".fc";
	setAttr ".fc[0]" -type "polyFaces" f 4 0 3 -6 -3;
	setAttr ".fc[1]" -type "polyFaces" f 4 1 4 -7 -4;
"#;

#[test]
fn test_split_streams_check_declared_totals() {
    init_logging();
    let mut scene = MemoryScene::with_defaults();
    let report = import_from_string(SPLIT_STREAMS, &mut scene, &ImportConfig::default()).unwrap();
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    let mesh = scene.mesh("pPlaneShape1").unwrap();
    assert_eq!(mesh.positions.len(), 6);
    assert_eq!(mesh.faces, vec![vec![0, 1, 4, 3], vec![1, 2, 5, 4]]);

    // Dropping a chunk leaves fewer vertices than declared
    let truncated = SPLIT_STREAMS.replace(r#"setAttr ".vt[3:5]" 0 1 0 1 1 0 2 1 0;"#, "");
    let mut scene = MemoryScene::with_defaults();
    let report = import_from_string(&truncated, &mut scene, &ImportConfig::default()).unwrap();
    assert_eq!(kind_count(&report, DiagnosticKind::Format), 1);
    assert!(report.transaction.meshes.is_empty());
    assert!(scene.mesh("pPlaneShape1").is_none());
}

#[test]
fn test_out_of_range_indices_are_format_errors() {
    for (find, replace) in [
        (r#"setAttr ".vt[3:5]""#, r#"setAttr ".vt[18446744073709551615]""#),
        ("f 4 1 4 -7 -4", "f 4 1 4 -7 -9223372036854775808"),
    ] {
        let content = SPLIT_STREAMS.replace(find, replace);
        let mut scene = MemoryScene::with_defaults();
        let report = import_from_string(&content, &mut scene, &ImportConfig::default()).unwrap();
        assert_eq!(kind_count(&report, DiagnosticKind::Format), 1, "{}", replace);
        assert!(scene.mesh("pPlaneShape1").is_none());
        // The parent transform is still built
        assert!(scene.exists("pPlane1"));
    }
}

#[test]
fn test_uv_set_accumulation() {
    let content = r#"createNode transform -n "plane";
createNode mesh -n "planeShape" -p "plane";
	setAttr -s 2 ".uvst";
	setAttr ".uvst[0].uvsn" -type "string" "map1";
	setAttr -s 4 ".uvst[0].uvsp";
	setAttr ".uvst[0].uvsp[0:1]" -type "float2" 0 0 1 0;
	setAttr ".uvst[0].uvsp[2:3]" -type "float2" 0 1 1 1;
	setAttr ".uvst[1].uvsn" -type "string" "lightmap";
	setAttr ".uvst[1].uvsp[0:3]" -type "float2" 0.5 0.5 0.75 0.5 0.5 0.75 0.75 0.75;
	setAttr -s 4 ".vt[0:3]"  -0.5 -0.5 0 0.5 -0.5 0 -0.5 0.5 0 0.5 0.5 0;
	setAttr -s 4 ".ed[0:3]"  0 1 0 0 2 0 1 3 0 2 3 0;
	setAttr ".fc[0]" -type "polyFaces" f 4 0 2 -4 -2 mu 0 4 0 1 3 2 mu 1 4 3 2 0 1;
"#;
    let mut scene = MemoryScene::with_defaults();
    let report = import_from_string(content, &mut scene, &ImportConfig::default()).unwrap();
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let mesh = scene.mesh("planeShape").unwrap();
    let map1 = mesh.uv_set("map1").unwrap();
    assert_eq!(
        map1.uvs,
        vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0)]
    );
    let lightmap = mesh.uv_set("lightmap").unwrap();
    assert_eq!(lightmap.uvs.len(), 4);
    assert_eq!(lightmap.ids, vec![3, 2, 0, 1]);
    assert_eq!(mesh.uv_sets.len(), 2);
}

#[test]
fn test_color_sets() {
    let content = r#"createNode mesh -n "triShape";
	setAttr ".clst[0].clsn" -type "string" "colorSet1";
	setAttr ".clst[0].rprt" 3;
	setAttr -s 3 ".clst[0].clsp[0:2]" 1 0 0 0 1 0 0 0 1;
	setAttr -s 3 ".vt[0:2]" 0 0 0 1 0 0 0 1 0;
	setAttr -s 3 ".ed[0:2]" 0 1 0 1 2 0 2 0 0;
	setAttr -s 1 ".fc[0]" -type "polyFaces" f 3 0 1 2 mc 0 3 0 1 2;
"#;
    let mut scene = MemoryScene::with_defaults();
    let report = import_from_string(content, &mut scene, &ImportConfig::default()).unwrap();
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let mesh = scene.mesh("triShape").unwrap();
    let set = mesh.color_set("colorSet1").unwrap();
    assert_eq!(set.channels, 3);
    assert_eq!(set.colors.len(), 3);
    assert_eq!(set.colors[1].vertex, 1);
    assert_eq!(set.colors[1].color, Color::rgb(0.0, 1.0, 0.0));
    assert_eq!(mesh.current_color_set.as_deref(), Some("colorSet1"));
}

#[test]
fn test_format_error_skips_only_that_mesh() {
    let content = r#"createNode mesh -n "badShape";
	setAttr -s 4 ".ed[0:2]" 0 1 0 1 2 0 2 0 0;
	setAttr -s 3 ".vt[0:2]" 0 0 0 1 0 0 0 1 0;
	setAttr ".fc[0]" -type "polyFaces" f 3 0 1 2;
createNode mesh -n "goodShape";
	setAttr -s 3 ".vt[0:2]" 0 0 0 1 0 0 0 1 0;
	setAttr -s 3 ".ed[0:2]" 0 1 0 1 2 0 2 0 0;
	setAttr ".fc[0]" -type "polyFaces" f 3 0 1 2;
"#;
    let mut scene = MemoryScene::with_defaults();
    let report = import_from_string(content, &mut scene, &ImportConfig::default()).unwrap();

    assert_eq!(report.transaction.meshes, vec!["goodShape"]);
    assert_eq!(kind_count(&report, DiagnosticKind::Format), 1);
    assert_eq!(report.diagnostics[0].subject, "badShape");
    assert!(!scene.exists("badShape"));
}

const SKINNED: &str = r#"createNode transform -n "body";
createNode mesh -n "bodyShape" -p "body";
	setAttr -s 3 ".vt[0:2]" 0 0 0 1 0 0 0 1 0;
	setAttr -s 3 ".ed[0:2]" 0 1 0 1 2 0 2 0 0;
	setAttr -s 1 ".fc[0]" -type "polyFaces" f 3 0 1 2;
createNode joint -n "joint1";
createNode joint -n "joint2" -p "joint1";
	setAttr ".t" -type "double3" 0 1 0 ;
createNode skinCluster -n "skinCluster1";
	setAttr -s 3 ".wl";
	setAttr ".wl[0:2].w"
		1 0 1
		2 0 0.5 1 0.5
		1 1 1;
	setAttr -s 2 ".pm";
	setAttr ".mi" 2;
connectAttr "skinCluster1.og[0]" "bodyShape.i";
connectAttr "joint1.wm" "skinCluster1.ma[0]";
connectAttr "joint2.wm" "skinCluster1.ma[1]";
"#;

#[test]
fn test_skin_weights() {
    init_logging();
    let mut scene = MemoryScene::with_defaults();
    let report = import_from_string(SKINNED, &mut scene, &ImportConfig::default()).unwrap();
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    assert!(report.transaction.others.contains(&"skinCluster1".to_string()));
    assert_eq!(scene.full_path("joint2").as_deref(), Some("|joint1|joint2"));
    assert_eq!(scene.skin_bound_meshes("skinCluster1"), vec!["bodyShape"]);
    assert_eq!(scene.skin_weight("skinCluster1", 0, 0), Some(1.0));
    assert_eq!(scene.skin_weight("skinCluster1", 1, 0), Some(0.5));
    assert_eq!(scene.skin_weight("skinCluster1", 1, 1), Some(0.5));
    assert_eq!(scene.skin_weight("skinCluster1", 2, 1), Some(1.0));
    assert_eq!(scene.skin_weight("skinCluster1", 2, 0), None);
}

#[test]
fn test_truncated_skin_weights() {
    let content = SKINNED.replace("0.5 1 0.5", "0.5").replace("1 1 1;", ";");
    let mut scene = MemoryScene::with_defaults();
    let report = import_from_string(&content, &mut scene, &ImportConfig::default()).unwrap();

    assert_eq!(kind_count(&report, DiagnosticKind::Format), 1);
    assert_eq!(report.diagnostics[0].subject, "skinCluster1");
    assert_eq!(scene.skin_weight("skinCluster1", 0, 0), Some(1.0));
    assert_eq!(scene.skin_weight("skinCluster1", 1, 0), Some(0.5));
}

const BLEND_SHAPE: &str = r#"createNode blendShape -n "blendShape1";
	addAttr -ci true -h true -sn "aal" -ln "attributeAliasList" -dt "attributeAlias";
	setAttr -s 2 ".w[0:1]"  0 0;
	setAttr ".aal" -type "attributeAlias" {"smile","weight[0]","frown","weight[1]"} ;
"#;

#[test]
fn test_blend_shape_registration() {
    let mut scene = MemoryScene::with_defaults();
    let config = ImportConfig::default();

    let first = import_from_string(BLEND_SHAPE, &mut scene, &config).unwrap();
    assert!(first.diagnostics.is_empty(), "{:?}", first.diagnostics);
    let node = scene.node("blendShape1").unwrap();
    assert_eq!(node.aliases.get("smile").map(String::as_str), Some("blendShape1.weight[0]"));
    assert_eq!(node.aliases.get("frown").map(String::as_str), Some("blendShape1.weight[1]"));
    assert!(node.dynamic_attrs.is_empty());
    assert_eq!(first.transaction.connections.len(), 1);
    assert_eq!(
        first.transaction.connections[0].target,
        "blendShape1.targetDirectory[0].directoryParentVisibility"
    );

    let second = import_from_string(BLEND_SHAPE, &mut scene, &config).unwrap();
    assert_eq!(second.transaction.others, vec!["blendShape2"]);
    assert_eq!(
        second.transaction.connections[0].source,
        "shapeEditorManager.outBlendShapeVisibility[1]"
    );
    assert_eq!(scene.directory_child_indices("shapeEditorManager"), vec![0, 1]);
}

#[test]
fn test_undo_leaves_no_trace() {
    init_logging();
    let mut scene = MemoryScene::with_defaults();
    let baseline_nodes = scene.node_count();
    let baseline_connections = scene.connections().len();

    let mut command = ImportCommand::new(test_asset_path("assets/two_materials.ma"), ImportConfig::default());
    let report = command.execute(&mut scene).unwrap();
    assert!(scene.node_count() > baseline_nodes);

    command.undo(&mut scene).unwrap();
    for name in report.transaction.node_names() {
        assert!(!scene.exists(name), "{} survived undo", name);
    }
    for connection in &report.transaction.connections {
        assert!(!scene.is_connected(&connection.source, &connection.target));
    }
    assert_eq!(scene.node_count(), baseline_nodes);
    assert_eq!(scene.connections().len(), baseline_connections);

    let redone = command.redo(&mut scene).unwrap();
    assert_eq!(redone.transaction.meshes, report.transaction.meshes);
    assert_eq!(scene.face_shading_group("pCubeShape1", 4), Some("blueSG"));
}

#[test]
fn test_config_from_json_excludes_types() {
    let config = ImportConfig::from_json(r#"{ "ignored_types": ["groupId", "materialInfo", "script", "camera"] }"#).unwrap();
    let mut scene = MemoryScene::with_defaults();
    let report = import_file(test_asset_path("assets/two_materials.ma"), &mut scene, &config).unwrap();

    assert!(report.transaction.others.is_empty());
    assert!(!scene.exists("groupId1"));
    // Connections from excluded nodes have nothing to attach to
    assert!(kind_count(&report, DiagnosticKind::MissingNode) >= 4);
}
