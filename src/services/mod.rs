// Catalog and accounts
pub mod books;
pub mod categories;
pub mod ratings;
pub mod users;

// Cart and checkout
pub mod cart;
pub mod orders;
pub mod payment_methods;
pub mod payments;

// Stock rules shared by checkout and payment compensation
pub mod stock;

#[cfg(test)]
pub(crate) mod fixtures;
