pub mod reservation;
pub mod resource;
pub mod session;

pub use reservation::{
    CheckoutDraft, CheckoutResult, CreateWithPayment, Invoice, NewReservation, Payment,
    PaymentMethod, PaymentRequest, PaymentSummary, Reservation, ReservationWithPayment,
};
pub use resource::{
    FieldConfig, FieldType, Record, ReportConfig, ResourceConfig, SelectOption,
};
pub use session::{SessionUser, StoredSession};
