mod actions;
mod card;
mod collection;
mod error;
mod reducers;
mod serializer;
mod validation;
mod visibility;

pub use actions::{CardEvent, CardOutcome, OptionEdit, SaveMode, StageSelection, UploadEdit};
pub use card::{
    CardId, CardState, FIELD_HELP, FIELD_ID, FIELD_LABEL, FIELD_ORDER, FIELD_ORIGIN,
    FIELD_REQUIRED, FIELD_TYPE, Lifecycle,
};
pub use collection::{
    CardCollection, DEFAULT_PREFIX, INITIAL_FORMS, PendingLoad, TOTAL_FORMS, group_card_fields,
    parse_field_map, split_card_key,
};
pub use error::{PayloadError, SkeletonError};
pub use reducers::apply_card_event;
pub use serializer::{
    UploadPanel, decode_external, decode_options, encode_external, encode_options, encode_upload,
    limit_in_range, options_payload, parse_limit,
};
pub use validation::{
    CardErrors, ErrorSlot, MSG_CATEGORY_REQUIRED, MSG_LABEL_REQUIRED, MSG_MAX_FILES_RANGE,
    MSG_MAX_SIZE_RANGE, MSG_OPTIONS_REQUIRED, MSG_TYPE_REQUIRED, validate_card,
};
pub use visibility::PanelVisibility;
