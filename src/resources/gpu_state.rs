/// Depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Which faces are culled when culling is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFace {
    Front,
    #[default]
    Back,
    FrontAndBack,
}

/// Winding order considered front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    Cw,
    #[default]
    Ccw,
}

/// Blend factor for source or destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendEquation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
}

/// Fixed-function GPU state applied before a draw.
///
/// The renderer only stores and forwards this value; the backend performs
/// the actual state changes. [`GpuState::default`] is the state applied at
/// the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuState {
    pub depth_test: bool,
    pub depth_mask: bool,
    pub depth_func: DepthFunc,
    pub cull: bool,
    pub cull_face: CullFace,
    pub front_face: FrontFace,
    pub blend: bool,
    pub blend_src: BlendFactor,
    pub blend_dst: BlendFactor,
    pub blend_equation: BlendEquation,
    pub color_mask: [bool; 4],
    pub line_width: f32,
}

impl Default for GpuState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_mask: true,
            depth_func: DepthFunc::Less,
            cull: true,
            cull_face: CullFace::Back,
            front_face: FrontFace::Ccw,
            blend: false,
            blend_src: BlendFactor::SrcAlpha,
            blend_dst: BlendFactor::OneMinusSrcAlpha,
            blend_equation: BlendEquation::Add,
            color_mask: [true; 4],
            line_width: 1.0,
        }
    }
}

impl GpuState {
    /// State suited for alpha-blended geometry: blending on, depth writes off.
    #[must_use]
    pub fn transparent() -> Self {
        Self {
            blend: true,
            depth_mask: false,
            ..Self::default()
        }
    }
}
