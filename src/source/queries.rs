//! Warehouse queries, one per family of the daily snapshot. Every query is
//! scoped to a single day and branch; ORDER BY keeps row order stable so the
//! generated payloads are reproducible.

pub const SALES_FOR_DAY: &str = r#"
    SELECT
        customer_code,
        product_code,
        quantity,
        unit_price,
        list_price,
        is_gift,
        invoice_series,
        invoice_number,
        nfe_key,
        icms_rate,
        icms_amount,
        cst
    FROM sales
    WHERE sale_date = :day AND branch_code = :branch
    ORDER BY invoice_number, product_code
"#;

pub const RETURNS_FOR_DAY: &str = r#"
    SELECT
        customer_code,
        product_code,
        quantity
    FROM sales_returns
    WHERE return_date = :day AND branch_code = :branch
    ORDER BY customer_code, product_code
"#;

pub const BRANCH: &str = r#"
    SELECT
        branch_code,
        cnpj,
        legal_name,
        trade_name,
        phone,
        street,
        postal_code,
        city,
        state
    FROM branches
    WHERE branch_code = :branch
"#;

pub const CUSTOMERS_FOR_DAY: &str = r#"
    SELECT
        customer_code,
        document,
        name,
        trade_name,
        phone,
        street,
        postal_code,
        city,
        state
    FROM customers
    WHERE customer_code IN (
        SELECT customer_code FROM sales
        WHERE sale_date = :day AND branch_code = :branch
        UNION
        SELECT customer_code FROM sales_returns
        WHERE return_date = :day AND branch_code = :branch
    )
    ORDER BY customer_code
"#;

pub const PRODUCTS_SOLD_ON_DAY: &str = r#"
    SELECT DISTINCT
        p.product_code,
        p.ean,
        p.ncm,
        p.description,
        p.manufacturer,
        p.list_price
    FROM products p
    JOIN sales s ON s.product_code = p.product_code
    WHERE s.sale_date = :day AND s.branch_code = :branch
    ORDER BY p.product_code
"#;

pub const STOCK_LEVELS: &str = r#"
    SELECT
        s.product_code,
        p.ean,
        s.quantity
    FROM stock_levels s
    LEFT JOIN products p ON p.product_code = s.product_code
    WHERE s.branch_code = :branch
    ORDER BY s.product_code
"#;

/// Ordered oldest first so that inserting into a map leaves the newest
/// receipt as the fallback for each product.
pub const RECEIPTS_THROUGH_DAY: &str = r#"
    SELECT
        product_code,
        ean,
        list_price
    FROM product_receipts
    WHERE receipt_date <= :day
    ORDER BY receipt_date
"#;
