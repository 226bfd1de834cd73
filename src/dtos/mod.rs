pub mod walletdtos;
