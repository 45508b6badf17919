pub mod cache;
pub mod model;
pub mod schedule;
pub mod settings;
pub mod storage;
pub mod time;

pub use cache::{PLAN_KEY, PROFILE_KEY, ResultCache, SCHEDULE_KEY, StoredProfile};
pub use model::{
    FeedbackRequest, Goal, NudgeRequest, Plan, PlanItem, PlanRequest, ScheduleEvent,
    ScheduleEventKind, UserProfile,
};
pub use schedule::{ScheduleInputError, build_schedule_events, build_schedule_events_on};
pub use settings::{
    DEFAULT_GATEWAY_URL, DEFAULT_USER_ID, SETTINGS_KEY, Settings, SettingsPatch, SettingsStore,
};
pub use storage::{
    ENV_STATE_DIR, FileStore, KeyValueStore, MemoryStore, StoreError, resolve_state_dir,
};
pub use time::{is_hh_mm, iso_on_date_at, iso_today_at, parse_times};
