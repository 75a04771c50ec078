#![cfg(feature = "encore-serde")]

mod common;

use encore::{BackendKind, DeviceInfo, ResourceKind, ResourceLayoutDescription, ShaderStages};

const DEVICE_YAML: &str = r#"
debug_name: offline-baker
entry_block_size: 4096
execution_thread_name: baker-exec
"#;

const LAYOUT_YAML: &str = r#"
elements:
  - name: Camera
    kind: UniformBuffer
    stages: VERTEX
    options: DYNAMIC_BINDING
  - name: Albedo
    kind: TextureReadOnly
    stages: FRAGMENT
    options: ""
  - name: LinearClamp
    kind: Sampler
    stages: FRAGMENT
    options: ""
"#;

#[test]
fn device_info_loads_from_yaml_file() {
    let path = std::env::temp_dir().join(format!("encore-device-{}.yaml", std::process::id()));
    std::fs::write(&path, DEVICE_YAML).unwrap();

    let info = DeviceInfo::from_yaml_file(path.to_str().unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(info.debug_name, "offline-baker");
    assert_eq!(info.entry_block_size, 4096);
    assert_eq!(info.state_cache_soft_limit, DeviceInfo::default().state_cache_soft_limit);

    let gpu = common::device_with(BackendKind::CommandBuffer, info);
    let list = gpu.create_command_list();
    assert_eq!(list.entries().block_size(), 4096);
}

#[test]
fn missing_file_names_the_path() {
    let err = DeviceInfo::from_yaml_file("/nonexistent/encore.yaml").unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/encore.yaml"));
}

#[test]
fn layout_description_loads_from_yaml() {
    let desc: ResourceLayoutDescription = serde_yaml::from_str(LAYOUT_YAML).unwrap();
    assert_eq!(desc.elements.len(), 3);
    assert!(desc.elements[0].is_dynamic());
    assert_eq!(desc.elements[1].kind, ResourceKind::TextureReadOnly);
    assert_eq!(desc.elements[2].stages, ShaderStages::FRAGMENT);

    let gpu = common::device(BackendKind::CommandBuffer);
    let layout = gpu.create_resource_layout(&desc).unwrap();
    assert_eq!(layout.dynamic_buffer_count(), 1);
}
