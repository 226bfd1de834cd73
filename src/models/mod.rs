pub mod usermodel;
pub mod walletmodels;
