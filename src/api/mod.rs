pub mod v1alpha1;
pub mod v2alpha1;
