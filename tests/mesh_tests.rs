//! Integration tests for meshes.
//!
//! Tests are parameterized using `rstest` over device capability profiles.

mod common;

use rstest::rstest;

use common::{create_offset_mesh, create_quad_mesh, visited_vertices, Profile};
use redlilium_drawables::backend::DeviceCommand;
use redlilium_drawables::{
    AttributeStep, GraphicsError, ImageData, Mat4, TextureDefaults, TextureResource, Transform2D,
    Vec2,
};

// ============================================================================
// Vertex Access
// ============================================================================

#[rstest]
#[case::exact(16, 16)]
#[case::short(6, 6)]
#[case::oversized(40, 16)]
fn test_set_vertex_copies_at_most_one_stride(#[case] len: usize, #[case] expected: usize) {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    let data = common::generate_test_pattern(len);

    mesh.set_vertex(2, &data).unwrap();

    let mut out = vec![0u8; mesh.vertex_stride()];
    assert_eq!(mesh.get_vertex(2, &mut out).unwrap(), 16);
    assert_eq!(&out[..expected], &data[..expected]);
}

#[test]
fn test_scratch_buffer_round_trip() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);

    let scratch = mesh.vertex_scratch_buffer();
    assert_eq!(scratch.len(), 16);
    scratch.copy_from_slice(&[7; 16]);
    let copy = scratch.to_vec();
    mesh.set_vertex(0, &copy).unwrap();

    let mut out = [0u8; 16];
    mesh.get_vertex(0, &mut out).unwrap();
    assert_eq!(out, [7; 16]);
}

// ============================================================================
// Draw Ranges
// ============================================================================

#[rstest]
#[case::modern(Profile::Modern)]
#[case::legacy(Profile::Legacy)]
fn test_draw_range(#[case] profile: Profile) {
    let mut device = profile.device();
    let mut mesh = create_quad_mesh(&mut device);

    mesh.set_draw_range(1, 2);
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    mesh.reset_draw_range();
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();

    let draws = device.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].range, 1..3);
    assert_eq!(draws[1].range, 0..4);
    assert!(draws.iter().all(|d| d.instances == 1 && !d.is_indexed()));
}

#[test]
fn test_empty_range_issues_no_draw() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    mesh.set_draw_range(4, 3);
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    mesh.draw_instanced(&mut device, Mat4::IDENTITY, 0).unwrap();
    assert!(device.draws().is_empty());
}

// ============================================================================
// Vertex Map
// ============================================================================

#[rstest]
#[case::modern(Profile::Modern)]
#[case::legacy(Profile::Legacy)]
fn test_identity_map_draws_like_no_map(#[case] profile: Profile) {
    let mut device = profile.device();
    let mut mesh = create_quad_mesh(&mut device);

    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    let unmapped = {
        let draws = device.draws();
        visited_vertices(&device, draws[0])
    };

    mesh.set_vertex_map(&mut device, &[0, 1, 2, 3]).unwrap();
    device.clear_commands();
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    let draws = device.draws();
    assert!(draws[0].is_indexed());
    assert_eq!(visited_vertices(&device, draws[0]), unmapped);
}

#[test]
fn test_vertex_map_order_and_clear() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);

    mesh.set_vertex_map(&mut device, &[3, 2, 1, 0, 1]).unwrap();
    mesh.set_draw_range(1, 3);
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    let visited = visited_vertices(&device, device.draws()[0]);
    assert_eq!(visited, vec![2, 1, 0]);

    mesh.clear_vertex_map();
    assert_eq!(mesh.vertex_map(), None);
    device.clear_commands();
    mesh.reset_draw_range();
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    assert_eq!(visited_vertices(&device, device.draws()[0]), vec![0, 1, 2, 3]);
}

#[test]
fn test_vertex_map_grows_index_buffer() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);

    mesh.set_vertex_map(&mut device, &[0, 1]).unwrap();
    device.clear_commands();
    mesh.set_vertex_map(&mut device, &[0, 1, 2, 0, 2, 3]).unwrap();

    assert_eq!(
        device.count(|c| matches!(c, DeviceCommand::CreateBuffer { .. })),
        1
    );
    assert_eq!(
        device.count(|c| matches!(c, DeviceCommand::DestroyBuffer(_))),
        1
    );
    assert_eq!(mesh.vertex_map(), Some(vec![0, 1, 2, 0, 2, 3]));
}

// ============================================================================
// Attached Attributes
// ============================================================================

#[test]
fn test_attach_missing_attribute_is_rejected() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    let lender = create_offset_mesh(&mut device, 4);

    assert!(!mesh.attach_attribute(
        "foo",
        lender.vertex_buffer(),
        "nonexistent",
        AttributeStep::PerVertex
    ));
    assert!(mesh.attached_attributes().is_empty());
    assert!(!mesh.detach_attribute("foo"));
}

#[test]
fn test_attached_attribute_is_bound_after_primary() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    let lender = create_offset_mesh(&mut device, 8);

    assert!(mesh.attach_attribute(
        "Offset",
        lender.vertex_buffer(),
        "InstanceOffset",
        AttributeStep::PerInstance
    ));
    mesh.draw_instanced(&mut device, Mat4::IDENTITY, 8).unwrap();

    let bindings = device.attribute_bindings();
    let names: Vec<_> = bindings.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["VertexPosition", "VertexTexCoord", "Offset"]);
    assert_eq!(bindings[2].buffer, lender.vertex_buffer().read().handle());
    assert_eq!(bindings[2].step, AttributeStep::PerInstance);
    assert_eq!(device.draws()[0].instances, 8);
}

#[test]
fn test_attached_writes_are_flushed_at_draw() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    let mut lender = create_offset_mesh(&mut device, 4);
    mesh.attach_attribute(
        "Offset",
        lender.vertex_buffer(),
        "InstanceOffset",
        AttributeStep::PerVertex,
    );

    lender
        .set_vertex(1, bytemuck::cast_slice(&[3.0f32, 4.0]))
        .unwrap();
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();

    let handle = lender.vertex_buffer().read().handle();
    let contents = device.buffer_contents(handle).unwrap();
    assert_eq!(&contents[8..16], bytemuck::cast_slice::<f32, u8>(&[3.0, 4.0]));
}

#[test]
fn test_dead_lender_is_skipped_at_draw() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    let lender = create_offset_mesh(&mut device, 4);
    mesh.attach_attribute(
        "Offset",
        lender.vertex_buffer(),
        "InstanceOffset",
        AttributeStep::PerVertex,
    );

    lender.destroy(&mut device);
    assert!(!mesh.attached_attributes()[0].is_alive());

    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    assert_eq!(device.attribute_bindings().len(), 2);
    assert_eq!(device.draws().len(), 1);
}

#[test]
fn test_detach_stops_binding() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    let lender = create_offset_mesh(&mut device, 4);
    mesh.attach_attribute(
        "Offset",
        lender.vertex_buffer(),
        "InstanceOffset",
        AttributeStep::PerVertex,
    );

    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    assert_eq!(device.attribute_bindings().len(), 3);

    assert!(mesh.detach_attribute("Offset"));
    assert!(mesh.attached_attributes().is_empty());
    assert!(!mesh.detach_attribute("Offset"));
    assert!(matches!(
        mesh.is_attribute_enabled("Offset"),
        Err(GraphicsError::UnknownAttribute(_))
    ));

    device.clear_commands();
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    let names: Vec<_> = device
        .attribute_bindings()
        .iter()
        .map(|b| b.name.clone())
        .collect();
    assert_eq!(names, ["VertexPosition", "VertexTexCoord"]);
}

#[test]
fn test_mapped_lender_does_not_block_draw() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    let mut lender = create_offset_mesh(&mut device, 4);
    assert!(mesh.attach_attribute(
        "Offset",
        lender.vertex_buffer(),
        "InstanceOffset",
        AttributeStep::PerVertex,
    ));

    {
        let mut mapped = lender.map_vertex_data();
        mapped[0..4].copy_from_slice(&1.0f32.to_ne_bytes());

        // The lender is locked for the mapping: its stream is skipped.
        mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
        assert_eq!(device.attribute_bindings().len(), 2);
        assert_eq!(device.draws().len(), 1);
    }

    device.clear_commands();
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    assert_eq!(device.attribute_bindings().len(), 3);
    let handle = lender.vertex_buffer().read().handle();
    assert_eq!(
        &device.buffer_contents(handle).unwrap()[0..4],
        &1.0f32.to_ne_bytes()
    );
}

#[test]
fn test_disabled_attributes_are_not_bound() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    let lender = create_offset_mesh(&mut device, 4);
    mesh.attach_attribute(
        "Offset",
        lender.vertex_buffer(),
        "InstanceOffset",
        AttributeStep::PerVertex,
    );

    mesh.set_attribute_enabled("Offset", false).unwrap();
    mesh.set_attribute_enabled("VertexTexCoord", false).unwrap();
    assert_eq!(mesh.is_attribute_enabled("Offset"), Ok(false));
    assert!(matches!(
        mesh.set_attribute_enabled("Missing", true),
        Err(GraphicsError::UnknownAttribute(_))
    ));

    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    let names: Vec<_> = device
        .attribute_bindings()
        .iter()
        .map(|b| b.name.clone())
        .collect();
    assert_eq!(names, ["VertexPosition"]);
}

#[rstest]
#[case::many_instances(3, AttributeStep::PerVertex)]
#[case::per_instance_stream(1, AttributeStep::PerInstance)]
fn test_instancing_requires_capability(#[case] instances: u32, #[case] step: AttributeStep) {
    let mut device = Profile::Legacy.device();
    let mut mesh = create_quad_mesh(&mut device);
    let lender = create_offset_mesh(&mut device, 4);
    mesh.attach_attribute("Offset", lender.vertex_buffer(), "InstanceOffset", step);

    let result = mesh.draw_instanced(&mut device, Mat4::IDENTITY, instances);
    assert!(matches!(result, Err(GraphicsError::UnsupportedOperation(_))));
    assert!(device.draws().is_empty());
}

// ============================================================================
// Drawing State
// ============================================================================

#[test]
fn test_draw_binds_loaded_texture_and_transform() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);

    let image = ImageData::solid_color(4, 4, [255; 4]).unwrap();
    let texture = TextureResource::from_image(image, &TextureDefaults::default()).into_shared();
    mesh.set_texture(Some(texture.clone()));

    // Unloaded textures bind nothing.
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();
    assert!(device.commands().contains(&DeviceCommand::BindTexture(None)));

    texture.write().load(&mut device).unwrap();
    device.clear_commands();
    let transform = Transform2D::from_position(Vec2::new(5.0, 6.0));
    mesh.draw(&mut device, transform).unwrap();

    let handle = texture.read().handle();
    assert!(device.commands().contains(&DeviceCommand::BindTexture(handle)));
    assert!(device
        .commands()
        .contains(&DeviceCommand::SetTransform(transform.matrix())));

    texture.write().unload(&mut device);
}

#[test]
fn test_mapping_is_uploaded_on_draw() {
    let mut device = Profile::Modern.device();
    let mut mesh = create_quad_mesh(&mut device);
    mesh.flush(&mut device);

    {
        let mut mapped = mesh.map_vertex_data();
        mapped[16..20].copy_from_slice(&9.0f32.to_ne_bytes());
        mapped.unmap(16, 4);
    }
    device.clear_commands();
    mesh.draw(&mut device, Mat4::IDENTITY).unwrap();

    let handle = mesh.vertex_buffer().read().handle();
    assert!(device.commands().contains(&DeviceCommand::WriteBuffer {
        buffer: handle,
        offset: 16,
        len: 4
    }));
    assert_eq!(
        &device.buffer_contents(handle).unwrap()[16..20],
        &9.0f32.to_ne_bytes()
    );
}
