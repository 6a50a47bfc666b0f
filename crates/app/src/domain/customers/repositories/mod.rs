//! Customers Repositories

mod customers;
mod wishlists;

pub(crate) use customers::PgCustomersRepository;
pub(crate) use wishlists::PgWishlistsRepository;
