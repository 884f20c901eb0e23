use glam::{IVec2, IVec3, IVec4, Mat3, Mat4, Vec2, Vec3, Vec4};
use std::fmt;

// ============================================================================
// 1. Uniform type tags
// ============================================================================

/// Type tag of a uniform, as declared by a shader or carried by a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Bool,
    Mat3,
    Mat4,
}

impl UniformType {
    /// GLSL spelling of the type.
    #[must_use]
    pub fn glsl_name(self) -> &'static str {
        match self {
            UniformType::Float => "float",
            UniformType::Vec2 => "vec2",
            UniformType::Vec3 => "vec3",
            UniformType::Vec4 => "vec4",
            UniformType::Int => "int",
            UniformType::IVec2 => "ivec2",
            UniformType::IVec3 => "ivec3",
            UniformType::IVec4 => "ivec4",
            UniformType::Bool => "bool",
            UniformType::Mat3 => "mat3",
            UniformType::Mat4 => "mat4",
        }
    }

    /// Number of scalar components.
    #[must_use]
    pub fn components(self) -> usize {
        match self {
            UniformType::Float | UniformType::Int | UniformType::Bool => 1,
            UniformType::Vec2 | UniformType::IVec2 => 2,
            UniformType::Vec3 | UniformType::IVec3 => 3,
            UniformType::Vec4 | UniformType::IVec4 => 4,
            UniformType::Mat3 => 9,
            UniformType::Mat4 => 16,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

// ============================================================================
// 2. Uniform values
// ============================================================================

/// A uniform value.
///
/// The tag is checked at runtime against the declared type of the shader
/// uniform or against the type fixed by the first binding in a scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Int(i32),
    IVec2(IVec2),
    IVec3(IVec3),
    IVec4(IVec4),
    Bool(bool),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    #[must_use]
    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::IVec2(_) => UniformType::IVec2,
            UniformValue::IVec3(_) => UniformType::IVec3,
            UniformValue::IVec4(_) => UniformType::IVec4,
            UniformValue::Bool(_) => UniformType::Bool,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_type(&self, ty: UniformType) -> bool {
        self.uniform_type() == ty
    }

    /// Column-major float view, the layout uploaded by `glUniform*fv`.
    ///
    /// Integer and boolean values return `None`.
    #[must_use]
    pub fn as_floats(&self) -> Option<Vec<f32>> {
        match self {
            UniformValue::Float(v) => Some(vec![*v]),
            UniformValue::Vec2(v) => Some(v.to_array().to_vec()),
            UniformValue::Vec3(v) => Some(v.to_array().to_vec()),
            UniformValue::Vec4(v) => Some(v.to_array().to_vec()),
            UniformValue::Mat3(m) => Some(m.to_cols_array().to_vec()),
            UniformValue::Mat4(m) => Some(m.to_cols_array().to_vec()),
            UniformValue::Int(_)
            | UniformValue::IVec2(_)
            | UniformValue::IVec3(_)
            | UniformValue::IVec4(_)
            | UniformValue::Bool(_) => None,
        }
    }
}

macro_rules! impl_from_uniform {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(value: $ty) -> Self {
                    UniformValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_uniform! {
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    i32 => Int,
    IVec2 => IVec2,
    IVec3 => IVec3,
    IVec4 => IVec4,
    bool => Bool,
    Mat3 => Mat3,
    Mat4 => Mat4,
}

// ============================================================================
// 3. Named bindings
// ============================================================================

/// Ordered list of named uniform bindings with per-name fixed types.
///
/// Used for the object-global and system-global tiers. Insertion order is
/// preserved so uniforms are bound deterministically.
#[derive(Debug, Clone, Default)]
pub struct UniformBindings {
    items: Vec<(String, UniformValue)>,
}

impl UniformBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or updates a binding.
    ///
    /// Fails with the established type when `name` is already bound with a
    /// different type; the stored value is left untouched in that case.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<(), UniformType> {
        if let Some((_, existing)) = self.items.iter_mut().find(|(n, _)| n == name) {
            let expected = existing.uniform_type();
            if expected != value.uniform_type() {
                return Err(expected);
            }
            *existing = value;
        } else {
            self.items.push((name.to_string(), value));
        }
        Ok(())
    }

    /// Adds or overwrites a binding regardless of its previous type.
    pub fn replace(&mut self, name: &str, value: UniformValue) {
        if let Some((_, existing)) = self.items.iter_mut().find(|(n, _)| n == name) {
            *existing = value;
        } else {
            self.items.push((name.to_string(), value));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<UniformValue> {
        let index = self.items.iter().position(|(n, _)| n == name)?;
        Some(self.items.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.items.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
