pub mod db;
pub mod userdb;
pub mod walletdb;
