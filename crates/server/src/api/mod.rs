mod audit;
mod bookings;
mod directory;
mod events;
mod handlers;
mod middleware;
mod routes;

pub use routes::create_router;
