use rustc_hash::FxHashMap;

use crate::errors::{Result, StrataError};
use crate::resources::uniforms::{UniformBindings, UniformValue};
use crate::scene::object::RenderObject;

/// Owns every [`RenderObject`], keyed by name.
#[derive(Debug, Default)]
pub struct ObjectManager {
    objects: FxHashMap<String, RenderObject>,
}

impl ObjectManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty object. Fails if the name is taken.
    pub fn add(&mut self, name: &str) -> Result<&mut RenderObject> {
        if self.objects.contains_key(name) {
            return Err(StrataError::DuplicateObject(name.to_string()));
        }
        Ok(self
            .objects
            .entry(name.to_string())
            .or_insert_with(|| RenderObject::new(name)))
    }

    /// Removes an object and, with it, all of its passes.
    pub fn remove(&mut self, name: &str) -> Result<RenderObject> {
        self.objects
            .remove(name)
            .ok_or_else(|| StrataError::ObjectNotFound(name.to_string()))
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn get(&self, name: &str) -> Result<&RenderObject> {
        self.objects
            .get(name)
            .ok_or_else(|| StrataError::ObjectNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut RenderObject> {
        self.objects
            .get_mut(name)
            .ok_or_else(|| StrataError::ObjectNotFound(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderObject> {
        self.objects.values()
    }
}

/// System-global uniform tier.
///
/// The type of a name is fixed by its first binding.
#[derive(Debug, Default)]
pub struct GlobalUniforms {
    bindings: UniformBindings,
}

impl GlobalUniforms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<()> {
        self.bindings
            .set(name, value)
            .map_err(|expected| StrataError::UniformTypeMismatch {
                uniform: name.to_string(),
                expected,
                actual: value.uniform_type(),
            })
    }

    pub fn remove(&mut self, name: &str) -> Result<UniformValue> {
        self.bindings
            .remove(name)
            .ok_or_else(|| StrataError::UniformNotFound {
                uniform: name.to_string(),
                scope: "global uniforms".to_string(),
            })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.bindings.get(name)
    }

    #[must_use]
    pub fn bindings(&self) -> &UniformBindings {
        &self.bindings
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    #[test]
    fn object_names_are_unique() {
        let mut objects = ObjectManager::new();
        objects.add("obj1").unwrap();
        assert!(matches!(
            objects.add("obj1"),
            Err(StrataError::DuplicateObject(_))
        ));
        assert_eq!(objects.len(), 1);

        objects.add("obj2").unwrap();
        objects.remove("obj1").unwrap();
        assert_eq!(objects.len(), 1);
        assert!(matches!(
            objects.remove("obj1"),
            Err(StrataError::ObjectNotFound(_))
        ));

        objects.add("obj1").unwrap();
        objects.add("obj3").unwrap();
        assert_eq!(objects.len(), 3);
    }

    #[test]
    fn readded_object_starts_empty() {
        let mut objects = ObjectManager::new();
        objects
            .add("obj1")
            .unwrap()
            .set_metadata("id", 7_i32.into());
        objects.remove("obj1").unwrap();

        let obj = objects.add("obj1").unwrap();
        assert!(obj.metadata().is_empty());
        assert_eq!(obj.num_passes(), 0);
    }

    #[test]
    fn global_type_fixed_by_first_binding() {
        let mut globals = GlobalUniforms::new();
        globals.set("uProjIVObject", Mat4::IDENTITY.into()).unwrap();

        let err = globals.set("uProjIVObject", Vec3::ZERO.into()).unwrap_err();
        assert!(matches!(err, StrataError::UniformTypeMismatch { .. }));
        assert_eq!(
            globals.get("uProjIVObject"),
            Some(&UniformValue::Mat4(Mat4::IDENTITY))
        );

        globals.remove("uProjIVObject").unwrap();
        assert!(globals.remove("uProjIVObject").is_err());
    }
}
