use prism_state::state::{
    BlendEquation, BlendFactor, BlendState, CompareFunc, CullFace, FrontFace, RasterizerState,
    StencilOp,
};
use prism_state::webgpu::{
    translate_blend_equation, translate_blend_factor, translate_color_write_mask,
    translate_compare_func, translate_cull_and_front_face, translate_primitive_state,
    translate_stencil_op,
};

#[test]
fn cull_mode_respects_front_face() {
    let mut raster = RasterizerState {
        cull_face: true,
        cull_mode: CullFace::Back,
        front_face: FrontFace::Cw,
        ..RasterizerState::default()
    };
    let (front_face, cull_mode) = translate_cull_and_front_face(&raster);
    assert_eq!(front_face, wgpu::FrontFace::Cw);
    assert_eq!(cull_mode, Some(wgpu::Face::Back));

    raster.front_face = FrontFace::Ccw;
    raster.cull_mode = CullFace::Front;
    let (front_face, cull_mode) = translate_cull_and_front_face(&raster);
    assert_eq!(front_face, wgpu::FrontFace::Ccw);
    assert_eq!(cull_mode, Some(wgpu::Face::Front));

    raster.cull_face = false;
    assert_eq!(translate_cull_and_front_face(&raster).1, None);
}

#[test]
fn culling_both_faces_is_left_to_the_draw() {
    let raster = RasterizerState {
        cull_face: true,
        cull_mode: CullFace::FrontAndBack,
        ..RasterizerState::default()
    };
    assert!(raster.culls_everything());
    let primitive = translate_primitive_state(&raster, wgpu::PrimitiveTopology::TriangleStrip);
    assert_eq!(primitive.cull_mode, None);
    assert_eq!(primitive.topology, wgpu::PrimitiveTopology::TriangleStrip);
}

#[test]
fn compare_func_maps_correctly() {
    assert_eq!(
        translate_compare_func(CompareFunc::LessEqual),
        wgpu::CompareFunction::LessEqual
    );
    assert_eq!(
        translate_compare_func(CompareFunc::Always),
        wgpu::CompareFunction::Always
    );
}

#[test]
fn stencil_op_maps_correctly() {
    assert_eq!(
        translate_stencil_op(StencilOp::Incr),
        wgpu::StencilOperation::IncrementClamp
    );
    assert_eq!(
        translate_stencil_op(StencilOp::DecrWrap),
        wgpu::StencilOperation::DecrementWrap
    );
}

#[test]
fn blend_factor_maps_correctly() {
    assert_eq!(
        translate_blend_factor(BlendFactor::SrcAlpha),
        wgpu::BlendFactor::SrcAlpha
    );
    assert_eq!(
        translate_blend_factor(BlendFactor::OneMinusDstColor),
        wgpu::BlendFactor::OneMinusDst
    );
    assert_eq!(
        translate_blend_factor(BlendFactor::ConstantAlpha),
        wgpu::BlendFactor::Constant
    );
}

#[test]
fn blend_equation_maps_correctly() {
    assert_eq!(
        translate_blend_equation(BlendEquation::ReverseSubtract),
        wgpu::BlendOperation::ReverseSubtract
    );
    assert_eq!(
        translate_blend_equation(BlendEquation::Max),
        wgpu::BlendOperation::Max
    );
}

#[test]
fn color_write_mask_maps_correctly() {
    let blend = BlendState {
        color_mask_green: false,
        color_mask_alpha: false,
        ..BlendState::default()
    };
    let translated = translate_color_write_mask(&blend);
    assert!(translated.contains(wgpu::ColorWrites::RED));
    assert!(!translated.contains(wgpu::ColorWrites::GREEN));
    assert!(translated.contains(wgpu::ColorWrites::BLUE));
    assert!(!translated.contains(wgpu::ColorWrites::ALPHA));
}
