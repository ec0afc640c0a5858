//! The daily payload as the DataEntry layout wants it. Field names follow
//! the published layout, so the serde renames are the wire contract; the
//! Rust-side names are only for readability.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::extract::fields;
use crate::source::{DaySnapshot, ProductRow, SaleRow, StockRow};

#[derive(Debug, Clone, Serialize)]
pub struct DailyRecord {
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "estabelecimentos")]
    pub establishments: Vec<Establishment>,
    #[serde(rename = "clientes")]
    pub customers: Vec<Customer>,
    #[serde(rename = "produtos")]
    pub products: Vec<Product>,
    #[serde(rename = "vendas")]
    pub sales: Vec<Sale>,
    #[serde(rename = "vendasDevolucoesCancelamentos")]
    pub sale_returns: Vec<SaleReturn>,
    #[serde(rename = "estoque")]
    pub stock: Vec<StockLevel>,
    // Sections the layout requires even when this business never fills them.
    #[serde(rename = "profissionaisSaude")]
    pub health_professionals: Vec<Value>,
    #[serde(rename = "pacientes")]
    pub patients: Vec<Value>,
    #[serde(rename = "fornecedores")]
    pub suppliers: Vec<Value>,
    #[serde(rename = "planosSaude")]
    pub health_plans: Vec<Value>,
    #[serde(rename = "laboratoriosPBM")]
    pub pbm_laboratories: Vec<Value>,
    #[serde(rename = "compras")]
    pub purchases: Vec<Value>,
    #[serde(rename = "comprasDevolucoesCancelamentos")]
    pub purchase_returns: Vec<Value>,
    #[serde(rename = "prescricoes")]
    pub prescriptions: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Establishment {
    #[serde(rename = "cod")]
    pub code: String,
    #[serde(rename = "doc")]
    pub document: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "nomeOfc")]
    pub official_name: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "tipoCaptacaoPrescricao")]
    pub prescription_capture: u8,
    #[serde(rename = "ender")]
    pub address: Address,
    #[serde(rename = "codIqvia")]
    pub iqvia_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Address {
    #[serde(rename = "descr")]
    pub street: String,
    #[serde(rename = "compl")]
    pub complement: String,
    #[serde(rename = "cep")]
    pub postal_code: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "uf")]
    pub state: String,
    #[serde(rename = "tel")]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    #[serde(rename = "cod")]
    pub code: String,
    #[serde(rename = "doc")]
    pub document: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "nomeOfc")]
    pub official_name: String,
    #[serde(rename = "tipo")]
    pub kind: u8,
    #[serde(rename = "profSaude")]
    pub health_professional: u8,
    #[serde(rename = "ender")]
    pub address: Address,
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    #[serde(rename = "cod")]
    pub code: String,
    #[serde(rename = "eanSellIn")]
    pub ean_sell_in: String,
    #[serde(rename = "eanSellOut")]
    pub ean_sell_out: String,
    #[serde(rename = "ncm")]
    pub ncm: String,
    #[serde(rename = "apresent")]
    pub presentation: String,
    #[serde(rename = "fabr")]
    pub manufacturer: String,
    #[serde(rename = "precoFabrica")]
    pub factory_price: f64,
    #[serde(rename = "dispViaFarmaciaPopular")]
    pub via_popular_pharmacy: String,
    #[serde(rename = "dispViaPbm")]
    pub via_pbm: String,
    #[serde(rename = "marcaPropria")]
    pub own_brand: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    #[serde(rename = "codEstab")]
    pub establishment_code: String,
    #[serde(rename = "codCliente")]
    pub customer_code: String,
    #[serde(rename = "comPrescricao")]
    pub with_prescription: u8,
    #[serde(rename = "paraUsoProfSaude")]
    pub for_health_professional: u8,
    #[serde(rename = "codProfSaude")]
    pub health_professional_code: String,
    #[serde(rename = "codProd")]
    pub product_code: String,
    #[serde(rename = "dt")]
    pub date: String,
    #[serde(rename = "qt")]
    pub quantity: i64,
    #[serde(rename = "ecommerce")]
    pub ecommerce: u8,
    #[serde(rename = "meio")]
    pub channel: u8,
    #[serde(rename = "docTipo")]
    pub document_kind: u8,
    #[serde(rename = "docFiscalSerie")]
    pub fiscal_series: String,
    #[serde(rename = "docFiscalNum")]
    pub fiscal_number: i64,
    #[serde(rename = "danfe")]
    pub nfe_key: String,
    #[serde(rename = "vendaJudic")]
    pub judicial_sale: u8,
    #[serde(rename = "tipoPagto")]
    pub payment_kind: u8,
    #[serde(rename = "preco")]
    pub price: SalePrice,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalePrice {
    #[serde(rename = "valor")]
    pub amount: PriceAmount,
    #[serde(rename = "icms")]
    pub icms: Icms,
    #[serde(rename = "desconto", skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceAmount {
    #[serde(rename = "liquido")]
    pub net: f64,
    #[serde(rename = "bruto")]
    pub gross: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Icms {
    #[serde(rename = "isento")]
    pub exempt: u8,
    #[serde(rename = "aliq")]
    pub rate: f64,
    #[serde(rename = "valor")]
    pub amount: f64,
    #[serde(rename = "cst")]
    pub cst: String,
    #[serde(rename = "subsTrib")]
    pub tax_substitution: TaxSubstitution,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxSubstitution {
    #[serde(rename = "valor")]
    pub amount: i64,
    #[serde(rename = "embutidoPreco")]
    pub embedded_in_price: i64,
    #[serde(rename = "cest")]
    pub cest: String,
}

/// Gift lines carry a 100% end-consumer discount over the list price.
#[derive(Debug, Clone, Serialize)]
pub struct Discount {
    #[serde(rename = "paraConsumidorFinal")]
    pub end_consumer_kind: u8,
    #[serde(rename = "perc")]
    pub percent: f64,
    #[serde(rename = "valor")]
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleReturn {
    #[serde(rename = "codEstab")]
    pub establishment_code: String,
    #[serde(rename = "codCliente")]
    pub customer_code: String,
    #[serde(rename = "codProfSaude")]
    pub health_professional_code: String,
    #[serde(rename = "codProd")]
    pub product_code: String,
    #[serde(rename = "comPrescricao")]
    pub with_prescription: u8,
    #[serde(rename = "ecommerce")]
    pub ecommerce: u8,
    #[serde(rename = "dt")]
    pub date: String,
    #[serde(rename = "qt")]
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    #[serde(rename = "codEstab")]
    pub establishment_code: String,
    #[serde(rename = "codProd")]
    pub product_code: String,
    #[serde(rename = "dt")]
    pub date: String,
    #[serde(rename = "qt")]
    pub quantity: i64,
}

/// Counter sale; the only channel this business reports.
const CHANNEL_COUNTER: u8 = 5;
/// End-consumer discount reason used for gift lines.
const DISCOUNT_END_CONSUMER: u8 = 12;
const DEFAULT_CST: &str = "60";

/// Assembles the payload for one day from its warehouse snapshot.
pub fn build_daily_record(
    day: NaiveDate,
    iqvia_code: &str,
    snapshot: &DaySnapshot,
) -> DailyRecord {
    let date = day.format("%Y-%m-%d").to_string();

    let establishments = snapshot
        .branches
        .iter()
        .map(|branch| Establishment {
            code: fields::clip(&branch.branch_code.to_string(), 14),
            document: fields::format_cnpj(branch.cnpj.as_deref().unwrap_or("")),
            name: fields::clip(branch.legal_name.as_deref().unwrap_or(""), 40),
            official_name: fields::clip(branch.trade_name.as_deref().unwrap_or(""), 40),
            kind: "CD".to_string(),
            prescription_capture: 0,
            address: Address {
                street: fields::clip(branch.street.as_deref().unwrap_or(""), 70),
                complement: String::new(),
                postal_code: fields::format_cep(branch.postal_code.as_deref().unwrap_or("")),
                city: fields::clip(branch.city.as_deref().unwrap_or(""), 40),
                state: fields::clip(branch.state.as_deref().unwrap_or(""), 2),
                phone: fields::format_phone(branch.phone.as_deref().unwrap_or("")),
            },
            iqvia_code: fields::clip(iqvia_code, 10),
        })
        .collect();

    let customers = snapshot
        .customers
        .iter()
        .map(|customer| {
            let document_raw = customer.document.as_deref().unwrap_or("");
            let digits = fields::only_digits(document_raw);
            let document = if digits.len() >= 12 {
                fields::format_cnpj(document_raw)
            } else {
                fields::format_cpf(document_raw)
            };
            let kind = if digits.len() == 14 { 2 } else { 1 };

            Customer {
                code: fields::clip(&customer.customer_code.to_string(), 14),
                document,
                name: fields::clip(customer.name.as_deref().unwrap_or(""), 40),
                official_name: fields::clip(customer.trade_name.as_deref().unwrap_or(""), 40),
                kind,
                health_professional: 0,
                address: Address {
                    street: fields::clip(customer.street.as_deref().unwrap_or(""), 70),
                    complement: String::new(),
                    postal_code: fields::format_cep(
                        customer.postal_code.as_deref().unwrap_or(""),
                    ),
                    city: fields::clip(customer.city.as_deref().unwrap_or(""), 40),
                    state: fields::clip(customer.state.as_deref().unwrap_or(""), 2),
                    phone: fields::format_phone(customer.phone.as_deref().unwrap_or("")),
                },
            }
        })
        .collect();

    let products = snapshot
        .products
        .iter()
        .filter_map(|product| build_product(product, snapshot))
        .collect();

    let branch_code = snapshot
        .branches
        .first()
        .map(|b| b.branch_code.to_string())
        .unwrap_or_default();

    let sales = snapshot
        .sales
        .iter()
        .map(|sale| build_sale(sale, &branch_code, &date))
        .collect();

    let sale_returns = snapshot
        .returns
        .iter()
        .map(|ret| SaleReturn {
            establishment_code: fields::clip(&branch_code, 14),
            customer_code: fields::clip(&ret.customer_code.to_string(), 14),
            health_professional_code: "0".to_string(),
            product_code: fields::clip(&ret.product_code.to_string(), 13),
            with_prescription: 0,
            ecommerce: 0,
            date: date.clone(),
            quantity: ret.quantity.abs(),
        })
        .collect();

    let stock = snapshot
        .stock
        .iter()
        .filter_map(|level| build_stock_level(level, snapshot, &branch_code, &date))
        .collect();

    DailyRecord {
        date,
        establishments,
        customers,
        products,
        sales,
        sale_returns,
        stock,
        health_professionals: Vec::new(),
        patients: Vec::new(),
        suppliers: Vec::new(),
        health_plans: Vec::new(),
        pbm_laboratories: Vec::new(),
        purchases: Vec::new(),
        purchase_returns: Vec::new(),
        prescriptions: Vec::new(),
    }
}

/// Products without a resolvable EAN cannot be reported; the newest inbound
/// receipt fills in EAN and price when the catalog lacks them.
fn build_product(product: &ProductRow, snapshot: &DaySnapshot) -> Option<Product> {
    let mut ean = product.ean.clone().unwrap_or_default();
    let mut price = fields::round2(product.list_price.unwrap_or(0.0));

    if let Some(receipt) = snapshot.receipts.get(&product.product_code) {
        if ean.is_empty() {
            if let Some(receipt_ean) = receipt.ean.as_deref() {
                if !receipt_ean.is_empty() {
                    ean = receipt_ean.to_string();
                }
            }
        }
        if price == 0.0 {
            if let Some(receipt_price) = receipt.list_price {
                if receipt_price != 0.0 {
                    price = receipt_price;
                }
            }
        }
    }

    if ean.is_empty() {
        return None;
    }

    Some(Product {
        code: fields::clip(&product.product_code.to_string(), 13),
        ean_sell_in: fields::clip(&ean, 14),
        ean_sell_out: fields::clip(&ean, 14),
        ncm: fields::clip(product.ncm.as_deref().unwrap_or(""), 8),
        presentation: fields::clip(product.description.as_deref().unwrap_or(""), 70),
        manufacturer: fields::clip(product.manufacturer.as_deref().unwrap_or(""), 40),
        factory_price: fields::round2(price),
        via_popular_pharmacy: "0".to_string(),
        via_pbm: "0".to_string(),
        own_brand: "0".to_string(),
    })
}

fn build_sale(sale: &SaleRow, branch_code: &str, date: &str) -> Sale {
    let unit_price = fields::round2(sale.unit_price.unwrap_or(0.0));

    let is_gift = unit_price == 0.0 || sale.is_gift;
    let mut effective_price = unit_price;
    if is_gift && unit_price == 0.0 {
        effective_price = fields::round2(sale.list_price.unwrap_or(0.0));
    }

    let nfe_key = sale.nfe_key.clone().unwrap_or_default();
    let document_kind = if nfe_key.is_empty() { 0 } else { 2 };

    let cst = match sale.cst.as_deref() {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_CST.to_string(),
    };

    let discount = is_gift.then(|| Discount {
        end_consumer_kind: DISCOUNT_END_CONSUMER,
        percent: 100.0,
        amount: effective_price,
    });

    Sale {
        establishment_code: fields::clip(branch_code, 14),
        customer_code: fields::clip(&sale.customer_code.to_string(), 14),
        with_prescription: 0,
        for_health_professional: 0,
        health_professional_code: "0".to_string(),
        product_code: fields::clip(&sale.product_code.to_string(), 13),
        date: date.to_string(),
        quantity: sale.quantity,
        ecommerce: 0,
        channel: CHANNEL_COUNTER,
        document_kind,
        fiscal_series: sale.invoice_series.unwrap_or(0).to_string(),
        fiscal_number: sale.invoice_number.unwrap_or(0),
        nfe_key,
        judicial_sale: 0,
        payment_kind: 0,
        price: SalePrice {
            amount: PriceAmount {
                net: effective_price,
                gross: effective_price,
            },
            icms: Icms {
                exempt: 0,
                rate: fields::round2(sale.icms_rate.unwrap_or(0.0)),
                amount: fields::round2(sale.icms_amount.unwrap_or(0.0)),
                cst,
                tax_substitution: TaxSubstitution {
                    amount: 0,
                    embedded_in_price: 0,
                    cest: "0".to_string(),
                },
            },
            discount,
        },
    }
}

/// Stock lines are only reported for products whose EAN resolves, with the
/// same receipt fallback the catalog uses.
fn build_stock_level(
    level: &StockRow,
    snapshot: &DaySnapshot,
    branch_code: &str,
    date: &str,
) -> Option<StockLevel> {
    let mut ean = level.ean.clone().unwrap_or_default();
    if ean.is_empty() {
        if let Some(receipt) = snapshot.receipts.get(&level.product_code) {
            if let Some(receipt_ean) = receipt.ean.as_deref() {
                if !receipt_ean.is_empty() {
                    ean = receipt_ean.to_string();
                }
            }
        }
    }

    if ean.is_empty() {
        return None;
    }

    Some(StockLevel {
        establishment_code: fields::clip(branch_code, 14),
        product_code: fields::clip(&level.product_code.to_string(), 13),
        date: date.to_string(),
        quantity: level.quantity as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BranchRow, CustomerRow, ReceiptRow, ReturnRow};
    use std::collections::HashMap;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn branch() -> BranchRow {
        BranchRow {
            branch_code: 1,
            cnpj: Some("12345678000195".to_string()),
            legal_name: Some("Farma Demo Ltda".to_string()),
            trade_name: Some("Farma Demo".to_string()),
            phone: Some("(11) 98765-4321".to_string()),
            street: Some("Rua das Flores, 100".to_string()),
            postal_code: Some("1310100".to_string()),
            city: Some("Sao Paulo".to_string()),
            state: Some("SP".to_string()),
        }
    }

    fn sale() -> SaleRow {
        SaleRow {
            customer_code: 10,
            product_code: 100,
            quantity: 3,
            unit_price: Some(10.0),
            list_price: Some(12.5),
            is_gift: false,
            invoice_series: Some(1),
            invoice_number: Some(5001),
            nfe_key: Some("35240112345678000195550010000050011000050017".to_string()),
            icms_rate: Some(18.0),
            icms_amount: Some(5.4),
            cst: Some("60".to_string()),
        }
    }

    fn snapshot_with(sales: Vec<SaleRow>) -> DaySnapshot {
        DaySnapshot {
            sales,
            returns: Vec::new(),
            branches: vec![branch()],
            customers: Vec::new(),
            products: Vec::new(),
            stock: Vec::new(),
            receipts: HashMap::new(),
        }
    }

    #[test]
    fn test_record_carries_required_empty_sections() {
        let record = build_daily_record(day(), "0892", &snapshot_with(vec![sale()]));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["data"], "2024-01-02");
        for section in [
            "profissionaisSaude",
            "pacientes",
            "fornecedores",
            "planosSaude",
            "laboratoriosPBM",
            "compras",
            "comprasDevolucoesCancelamentos",
            "prescricoes",
        ] {
            assert_eq!(value[section], serde_json::json!([]), "section {}", section);
        }
    }

    #[test]
    fn test_establishment_formatting() {
        let record = build_daily_record(day(), "0892", &snapshot_with(Vec::new()));
        let value = serde_json::to_value(&record).unwrap();

        let estab = &value["estabelecimentos"][0];
        assert_eq!(estab["cod"], "1");
        assert_eq!(estab["doc"], "12345678000195");
        assert_eq!(estab["tipo"], "CD");
        assert_eq!(estab["tipoCaptacaoPrescricao"], 0);
        assert_eq!(estab["codIqvia"], "0892");
        assert_eq!(estab["ender"]["cep"], "01310100");
        assert_eq!(estab["ender"]["tel"], "11987654321");
        assert_eq!(estab["ender"]["compl"], "");
    }

    #[test]
    fn test_customer_document_decides_kind() {
        let mut snapshot = snapshot_with(Vec::new());
        snapshot.customers = vec![
            CustomerRow {
                customer_code: 10,
                document: Some("98765432000188".to_string()),
                name: Some("Drogaria Central Ltda".to_string()),
                trade_name: Some("Drogaria Central".to_string()),
                phone: None,
                street: None,
                postal_code: None,
                city: None,
                state: None,
            },
            CustomerRow {
                customer_code: 11,
                document: Some("321.654.987-01".to_string()),
                name: Some("Maria Souza".to_string()),
                trade_name: None,
                phone: None,
                street: None,
                postal_code: None,
                city: None,
                state: None,
            },
        ];

        let record = build_daily_record(day(), "0892", &snapshot);

        assert_eq!(record.customers[0].kind, 2);
        assert_eq!(record.customers[0].document, "98765432000188");
        assert_eq!(record.customers[1].kind, 1);
        assert_eq!(record.customers[1].document, "32165498701");
        assert_eq!(record.customers[1].health_professional, 0);
    }

    #[test]
    fn test_gift_line_discounts_list_price() {
        let mut gift = sale();
        gift.unit_price = Some(0.0);
        gift.nfe_key = None;

        let record = build_daily_record(day(), "0892", &snapshot_with(vec![gift]));
        let line = &record.sales[0];

        assert_eq!(line.price.amount.net, 12.5);
        assert_eq!(line.price.amount.gross, 12.5);
        assert_eq!(line.document_kind, 0);
        let discount = line.price.discount.as_ref().unwrap();
        assert_eq!(discount.percent, 100.0);
        assert_eq!(discount.amount, 12.5);
        assert_eq!(discount.end_consumer_kind, 12);
    }

    #[test]
    fn test_flagged_gift_keeps_charged_price() {
        let mut gift = sale();
        gift.is_gift = true;

        let record = build_daily_record(day(), "0892", &snapshot_with(vec![gift]));
        let line = &record.sales[0];

        assert_eq!(line.price.amount.net, 10.0);
        assert_eq!(line.price.discount.as_ref().unwrap().amount, 10.0);
    }

    #[test]
    fn test_regular_sale_has_no_discount_block() {
        let record = build_daily_record(day(), "0892", &snapshot_with(vec![sale()]));
        let value = serde_json::to_value(&record).unwrap();

        let line = &value["vendas"][0];
        assert_eq!(line["docTipo"], 2);
        assert_eq!(line["docFiscalSerie"], "1");
        assert_eq!(line["docFiscalNum"], 5001);
        assert_eq!(line["meio"], 5);
        assert!(line["preco"].get("desconto").is_none());
        assert_eq!(line["preco"]["icms"]["cst"], "60");
        assert_eq!(line["preco"]["icms"]["subsTrib"]["cest"], "0");
    }

    #[test]
    fn test_missing_cst_defaults() {
        let mut sale = sale();
        sale.cst = None;

        let record = build_daily_record(day(), "0892", &snapshot_with(vec![sale]));
        assert_eq!(record.sales[0].price.icms.cst, "60");
    }

    #[test]
    fn test_product_requires_resolvable_ean() {
        let mut snapshot = snapshot_with(Vec::new());
        snapshot.products = vec![
            ProductRow {
                product_code: 100,
                ean: Some("7891234567895".to_string()),
                ncm: Some("30049099".to_string()),
                description: Some("Dipirona 500mg 20cp".to_string()),
                manufacturer: Some("Lab Demo".to_string()),
                list_price: Some(12.5),
            },
            ProductRow {
                product_code: 101,
                ean: None,
                ncm: None,
                description: None,
                manufacturer: None,
                list_price: None,
            },
        ];

        let record = build_daily_record(day(), "0892", &snapshot);

        assert_eq!(record.products.len(), 1);
        assert_eq!(record.products[0].code, "100");
        assert_eq!(record.products[0].ean_sell_in, "7891234567895");
    }

    #[test]
    fn test_receipt_fallback_fills_ean_and_price() {
        let mut snapshot = snapshot_with(Vec::new());
        snapshot.products = vec![ProductRow {
            product_code: 101,
            ean: None,
            ncm: Some("30049010".to_string()),
            description: Some("Amoxicilina 500mg".to_string()),
            manufacturer: Some("Lab Demo".to_string()),
            list_price: Some(0.0),
        }];
        snapshot.receipts.insert(
            101,
            ReceiptRow {
                product_code: 101,
                ean: Some("7899999999992".to_string()),
                list_price: Some(30.0),
            },
        );

        let record = build_daily_record(day(), "0892", &snapshot);

        assert_eq!(record.products.len(), 1);
        assert_eq!(record.products[0].ean_sell_out, "7899999999992");
        assert_eq!(record.products[0].factory_price, 30.0);
    }

    #[test]
    fn test_returns_are_emitted_positive() {
        let mut snapshot = snapshot_with(Vec::new());
        snapshot.returns = vec![ReturnRow {
            customer_code: 10,
            product_code: 100,
            quantity: -2,
        }];

        let record = build_daily_record(day(), "0892", &snapshot);

        assert_eq!(record.sale_returns[0].quantity, 2);
        assert_eq!(record.sale_returns[0].establishment_code, "1");
        assert_eq!(record.sale_returns[0].date, "2024-01-02");
    }

    #[test]
    fn test_stock_skips_unresolvable_ean_and_keeps_product_code() {
        let mut snapshot = snapshot_with(Vec::new());
        snapshot.stock = vec![
            StockRow {
                product_code: 100,
                ean: Some("7891234567895".to_string()),
                quantity: 42.9,
            },
            StockRow {
                product_code: 999,
                ean: None,
                quantity: 7.0,
            },
        ];

        let record = build_daily_record(day(), "0892", &snapshot);

        assert_eq!(record.stock.len(), 1);
        assert_eq!(record.stock[0].product_code, "100");
        assert_eq!(record.stock[0].quantity, 42);
        assert_eq!(record.stock[0].date, "2024-01-02");
    }
}
