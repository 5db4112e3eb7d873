//! Property reflection for scripts
//!
//! Scripts describe their editable fields with a static list of
//! [`PropertyDescriptor`]s and hand out typed mutable views on request. The
//! instance always owns the backing storage.

use std::ffi::c_void;
use std::fmt;

/// Closed set of reflectable field types
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Float,
    Int,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    String,
}

impl PropertyType {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::Float => "float",
            PropertyType::Int => "int",
            PropertyType::Bool => "bool",
            PropertyType::Vec2 => "vec2",
            PropertyType::Vec3 => "vec3",
            PropertyType::Vec4 => "vec4",
            PropertyType::String => "string",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name and type of one reflectable field.
///
/// Descriptors are `'static` data inside the module that declared them; the
/// host copies them before the module can go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub ty: PropertyType,
}

impl PropertyDescriptor {
    pub const fn new(name: &'static str, ty: PropertyType) -> Self {
        Self { name, ty }
    }
}

/// Typed mutable view of a script field
#[derive(Debug)]
pub enum PropertyMut<'a> {
    Float(&'a mut f32),
    Int(&'a mut i32),
    Bool(&'a mut bool),
    Vec2(&'a mut [f32; 2]),
    Vec3(&'a mut [f32; 3]),
    Vec4(&'a mut [f32; 4]),
    String(&'a mut String),
}

impl<'a> PropertyMut<'a> {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyMut::Float(_) => PropertyType::Float,
            PropertyMut::Int(_) => PropertyType::Int,
            PropertyMut::Bool(_) => PropertyType::Bool,
            PropertyMut::Vec2(_) => PropertyType::Vec2,
            PropertyMut::Vec3(_) => PropertyType::Vec3,
            PropertyMut::Vec4(_) => PropertyType::Vec4,
            PropertyMut::String(_) => PropertyType::String,
        }
    }

    /// Raw address of the backing field
    pub fn as_ptr(&mut self) -> *mut c_void {
        match self {
            PropertyMut::Float(v) => (&mut **v as *mut f32).cast(),
            PropertyMut::Int(v) => (&mut **v as *mut i32).cast(),
            PropertyMut::Bool(v) => (&mut **v as *mut bool).cast(),
            PropertyMut::Vec2(v) => (&mut **v as *mut [f32; 2]).cast(),
            PropertyMut::Vec3(v) => (&mut **v as *mut [f32; 3]).cast(),
            PropertyMut::Vec4(v) => (&mut **v as *mut [f32; 4]).cast(),
            PropertyMut::String(v) => (&mut **v as *mut String).cast(),
        }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> PropertyValue {
        match self {
            PropertyMut::Float(v) => PropertyValue::Float(**v),
            PropertyMut::Int(v) => PropertyValue::Int(**v),
            PropertyMut::Bool(v) => PropertyValue::Bool(**v),
            PropertyMut::Vec2(v) => PropertyValue::Vec2(**v),
            PropertyMut::Vec3(v) => PropertyValue::Vec3(**v),
            PropertyMut::Vec4(v) => PropertyValue::Vec4(**v),
            PropertyMut::String(v) => PropertyValue::String((**v).clone()),
        }
    }

    /// Write `value` if its type matches; returns whether it was written
    pub fn set(&mut self, value: PropertyValue) -> bool {
        match (self, value) {
            (PropertyMut::Float(slot), PropertyValue::Float(v)) => **slot = v,
            (PropertyMut::Int(slot), PropertyValue::Int(v)) => **slot = v,
            (PropertyMut::Bool(slot), PropertyValue::Bool(v)) => **slot = v,
            (PropertyMut::Vec2(slot), PropertyValue::Vec2(v)) => **slot = v,
            (PropertyMut::Vec3(slot), PropertyValue::Vec3(v)) => **slot = v,
            (PropertyMut::Vec4(slot), PropertyValue::Vec4(v)) => **slot = v,
            (PropertyMut::String(slot), PropertyValue::String(v)) => **slot = v,
            _ => return false,
        }
        true
    }
}

/// Owned property value, as read by editors and the runner
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    String(String),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::Int(_) => PropertyType::Int,
            PropertyValue::Bool(_) => PropertyType::Bool,
            PropertyValue::Vec2(_) => PropertyType::Vec2,
            PropertyValue::Vec3(_) => PropertyType::Vec3,
            PropertyValue::Vec4(_) => PropertyType::Vec4,
            PropertyValue::String(_) => PropertyType::String,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Vec2([x, y]) => write!(f, "({}, {})", x, y),
            PropertyValue::Vec3([x, y, z]) => write!(f, "({}, {}, {})", x, y, z),
            PropertyValue::Vec4([x, y, z, w]) => write!(f, "({}, {}, {}, {})", x, y, z, w),
            PropertyValue::String(v) => write!(f, "{:?}", v),
        }
    }
}
