use crate::error::ProviderError;
use msg2capnp_schema::{FieldSpec, QualifiedType};

/// A source of message definitions: package directories on disk, a
/// recorded log, or a test fixture.
pub trait MetadataProvider {
    /// The declared fields of `ty`, in declaration order.
    fn fields(&self, ty: &QualifiedType) -> Result<Vec<FieldSpec>, ProviderError>;

    /// Every message type this source knows about.
    fn list_types(&self) -> Result<Vec<QualifiedType>, ProviderError>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for &P {
    fn fields(&self, ty: &QualifiedType) -> Result<Vec<FieldSpec>, ProviderError> {
        (**self).fields(ty)
    }

    fn list_types(&self) -> Result<Vec<QualifiedType>, ProviderError> {
        (**self).list_types()
    }
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Box<P> {
    fn fields(&self, ty: &QualifiedType) -> Result<Vec<FieldSpec>, ProviderError> {
        (**self).fields(ty)
    }

    fn list_types(&self) -> Result<Vec<QualifiedType>, ProviderError> {
        (**self).list_types()
    }
}
