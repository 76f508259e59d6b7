// Signup wizard: six-step onboarding for job seekers and employers.
// State transitions are pure (reducer); handlers load, apply and save.

pub mod cooldown;
pub mod fields;
pub mod handlers;
pub mod persistence;
pub mod reducer;
pub mod steps;
pub mod submission;
pub mod validation;
pub mod view;
pub mod wizard;
