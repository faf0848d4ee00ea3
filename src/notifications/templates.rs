//! Notification message bodies.

use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::Rupiah;

/// Buyer-facing message for an order that moved to `status`.
pub fn order_status_message(code: &str, status: OrderStatus) -> String {
    match status {
        OrderStatus::Paid => format!("Pembayaran untuk pesanan {} telah diterima", code),
        OrderStatus::Processing => format!("Pesanan {} sedang diproses oleh penjual", code),
        OrderStatus::Shipped => format!("Pesanan {} telah dikirim", code),
        OrderStatus::Received => format!("Pesanan {} telah diterima", code),
        OrderStatus::Completed => format!("Transaksi pesanan {} telah selesai", code),
        OrderStatus::Cancelled => format!("Pesanan {} telah dibatalkan", code),
        other => format!("Status pesanan {} telah diperbarui menjadi {}", code, other),
    }
}

pub fn new_order_message(code: &str, share: Rupiah) -> String {
    format!("Pesanan baru {} senilai {} telah dibayar", code, share)
}

pub fn offer_message(buyer_name: &str, product_name: &str, price: Rupiah) -> String {
    format!("{} membuat penawaran {} untuk {}", buyer_name, price, product_name)
}

pub fn offer_response_message(product_name: &str, accepted: bool) -> String {
    format!("Penawaran Anda untuk {} telah {}", product_name, if accepted { "diterima" } else { "ditolak" })
}

pub fn complaint_message(code: &str, status_label: &str) -> String {
    format!("Komplain untuk pesanan {} kini berstatus {}", code, status_label)
}

pub fn withdrawal_message(amount: Rupiah, status_label: &str) -> String {
    format!("Pencairan dana {} kini berstatus {}", amount, status_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_table() {
        assert_eq!(order_status_message("PB-1", OrderStatus::Paid), "Pembayaran untuk pesanan PB-1 telah diterima");
        assert_eq!(order_status_message("PB-1", OrderStatus::Processing), "Pesanan PB-1 sedang diproses oleh penjual");
        assert_eq!(order_status_message("PB-1", OrderStatus::Completed), "Transaksi pesanan PB-1 telah selesai");
        assert_eq!(order_status_message("PB-1", OrderStatus::AwaitingPayment), "Status pesanan PB-1 telah diperbarui menjadi Menunggu Pembayaran");
    }

    #[test]
    fn test_every_status_has_a_body() {
        for s in OrderStatus::ALL { assert!(!order_status_message("PB-9", s).is_empty()); }
    }

    #[test]
    fn test_offer_messages() {
        assert_eq!(offer_message("Sari", "Sepeda Lipat", Rupiah::new(1_250_000)), "Sari membuat penawaran Rp 1.250.000 untuk Sepeda Lipat");
        assert_eq!(offer_response_message("Sepeda Lipat", false), "Penawaran Anda untuk Sepeda Lipat telah ditolak");
    }
}
