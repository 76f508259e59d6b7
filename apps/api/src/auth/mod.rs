// Email verification: the link target of the "verify your email" message.
// All calls to the account backend go through accounts_client.

pub mod handlers;
