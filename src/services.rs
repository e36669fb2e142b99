pub mod auth_state;
pub mod calendar;
pub mod checkout;
pub mod columns;
pub mod crud;
pub mod crypto;
pub mod fields;
pub mod form;
pub mod registry;
pub mod reservation;
pub mod select_options;

pub use auth_state::AuthState;
pub use calendar::{CalendarDay, CalendarMonth, CalendarView, DayState};
pub use checkout::CheckoutService;
pub use crud::{CrudEngine, ReportState, ScrollLock};
pub use form::{FormMode, FormModel};
pub use registry::ResourceRegistry;
pub use reservation::{ReservationFilter, ReservationService};
pub use select_options::SelectOptionsCache;
