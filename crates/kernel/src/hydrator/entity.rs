//! Runtime-typed entities.
//!
//! Hydrators work on `dyn Entity` and recover the concrete type by downcasting.

use std::any::Any;

/// A hydratable object with a runtime class name.
///
/// Implement it with [`entity!`](crate::entity).
pub trait Entity: Any + Send + Sync + 'static {
    /// Class name used for hydrator dispatch.
    fn class_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Entity {
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Entity>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is<T: Entity>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Implement [`Entity`](crate::hydrator::Entity) for a type under a class name.
///
/// ```
/// #[derive(Default)]
/// struct User {
///     name: String,
/// }
///
/// sift_kernel::entity!(User, "app.user");
/// ```
#[macro_export]
macro_rules! entity {
    ($ty:ty, $class:expr) => {
        impl $crate::hydrator::Entity for $ty {
            fn class_name(&self) -> &str {
                $class
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    };
}
