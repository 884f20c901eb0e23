//! Enumerations shared between the public API and the graphics backend.

/// Primitive topology of a draw call.
///
/// See <https://www.opengl.org/wiki/Primitive>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    LinesAdjacency,
    LineStripAdjacency,
    TrianglesAdjacency,
    TriangleStripAdjacency,
}

impl PrimitiveType {
    #[must_use]
    pub fn is_adjacency(self) -> bool {
        matches!(
            self,
            PrimitiveType::LinesAdjacency
                | PrimitiveType::LineStripAdjacency
                | PrimitiveType::TrianglesAdjacency
                | PrimitiveType::TriangleStripAdjacency
        )
    }
}

/// Width of the indices stored in an IBO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U8,
    U16,
    U32,
}

impl IndexType {
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Component type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    HalfFloat,
    Double,
}

impl DataType {
    /// Size of one component in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            DataType::Byte | DataType::UByte => 1,
            DataType::Short | DataType::UShort | DataType::HalfFloat => 2,
            DataType::Int | DataType::UInt | DataType::Float => 4,
            DataType::Double => 8,
        }
    }
}

/// Programmable pipeline stage of a shader source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageKind {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStageKind {
    /// Only vertex and fragment stages are supported by the target profile.
    #[must_use]
    pub fn is_supported(self) -> bool {
        matches!(self, ShaderStageKind::Vertex | ShaderStageKind::Fragment)
    }
}
