//! The two executor back-ends the query facade can choose between
//! step 2): the pull-iterator "Python-path" executor and the alternate
//! vectorized (DataFrame) executor.

pub mod pull;
pub mod vectorized;
