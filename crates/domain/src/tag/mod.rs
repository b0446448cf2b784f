mod access_rights;
mod controller_map;
mod data_type;
mod quality;
mod tag_kind;
mod tag_name;
mod value;

pub use access_rights::AccessRights;
pub use controller_map::ControllerMap;
pub use data_type::DataType;
pub use quality::DataQuality;
pub use tag_kind::TagKind;
pub use tag_name::TagName;
pub use value::VariantValue;
