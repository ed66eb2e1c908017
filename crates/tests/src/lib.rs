
#[cfg(test)]
mod admin_tests;
#[cfg(test)]
mod promo_tests;
#[cfg(test)]
mod mongo_tests;
