//! Manual payroll entries, imports and employees.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use caboard_core::{Cents, EmployeeId, MandateId, Timestamp, YearMonth};
use caboard_payroll::{Employee, ManualPayrollEntry, PayrollImport};

use super::decode_error;

pub async fn put_manual(conn: &mut PgConnection, entry: &ManualPayrollEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO manual_payroll_entries (mandate_id, year, month, employee_count, gross_payroll)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (mandate_id, year, month) DO UPDATE SET
            employee_count = EXCLUDED.employee_count,
            gross_payroll = EXCLUDED.gross_payroll",
    )
    .bind(entry.mandate_id.0)
    .bind(entry.period.year())
    .bind(month_to_db(entry.period.month()))
    .bind(count_to_db(entry.employee_count))
    .bind(entry.gross_payroll.get())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn put_import(conn: &mut PgConnection, import: &PayrollImport) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payroll_imports (mandate_id, import_date, total_employees, period_year,
                                      period_month, gross_payroll)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (mandate_id, import_date) DO UPDATE SET
            total_employees = EXCLUDED.total_employees,
            period_year = EXCLUDED.period_year,
            period_month = EXCLUDED.period_month,
            gross_payroll = EXCLUDED.gross_payroll",
    )
    .bind(import.mandate_id.0)
    .bind(*import.import_date.as_datetime())
    .bind(count_to_db(import.total_employees))
    .bind(import.period.map(|p| p.year()))
    .bind(import.period.map(|p| month_to_db(p.month())))
    .bind(import.gross_payroll.get())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn put_employee(conn: &mut PgConnection, employee: &Employee) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO employees (id, mandate_id, name, active) VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, active = EXCLUDED.active",
    )
    .bind(employee.id.0)
    .bind(employee.mandate_id.0)
    .bind(&employee.name)
    .bind(employee.active)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_manual(
    conn: &mut PgConnection,
    mandate: MandateId,
    period: YearMonth,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM manual_payroll_entries WHERE mandate_id = $1 AND year = $2 AND month = $3")
        .bind(mandate.0)
        .bind(period.year())
        .bind(month_to_db(period.month()))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_import(
    conn: &mut PgConnection,
    mandate: MandateId,
    at: Timestamp,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM payroll_imports WHERE mandate_id = $1 AND import_date = $2")
        .bind(mandate.0)
        .bind(*at.as_datetime())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn load_manual(pool: &PgPool) -> Result<Vec<ManualPayrollEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ManualRow>(
        "SELECT mandate_id, year, month, employee_count, gross_payroll
         FROM manual_payroll_entries ORDER BY mandate_id, year, month",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(ManualRow::into_record).collect()
}

pub async fn load_imports(pool: &PgPool) -> Result<Vec<PayrollImport>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ImportRow>(
        "SELECT mandate_id, import_date, total_employees, period_year, period_month, gross_payroll
         FROM payroll_imports ORDER BY mandate_id, import_date",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(ImportRow::into_record).collect()
}

pub async fn load_employees(pool: &PgPool) -> Result<Vec<Employee>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EmployeeRow>(
        "SELECT id, mandate_id, name, active FROM employees ORDER BY mandate_id, name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| Employee {
            id: EmployeeId(r.id),
            mandate_id: MandateId(r.mandate_id),
            name: r.name,
            active: r.active,
        })
        .collect())
}

// Months are 1..=12 and head counts are u32, so both fit INTEGER columns.
fn month_to_db(month: u32) -> i32 {
    i32::try_from(month).unwrap_or(i32::MAX)
}

fn count_to_db(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn period_from_db(year: i32, month: i32) -> Result<YearMonth, sqlx::Error> {
    let month = u32::try_from(month).map_err(decode_error)?;
    YearMonth::new(year, month).map_err(decode_error)
}

fn count_from_db(count: i32) -> Result<u32, sqlx::Error> {
    u32::try_from(count).map_err(decode_error)
}

#[derive(sqlx::FromRow)]
struct ManualRow {
    mandate_id: Uuid,
    year: i32,
    month: i32,
    employee_count: i32,
    gross_payroll: i64,
}

impl ManualRow {
    fn into_record(self) -> Result<ManualPayrollEntry, sqlx::Error> {
        Ok(ManualPayrollEntry {
            mandate_id: MandateId(self.mandate_id),
            period: period_from_db(self.year, self.month)?,
            employee_count: count_from_db(self.employee_count)?,
            gross_payroll: Cents(self.gross_payroll),
        })
    }
}

#[derive(sqlx::FromRow)]
struct ImportRow {
    mandate_id: Uuid,
    import_date: DateTime<Utc>,
    total_employees: i32,
    period_year: Option<i32>,
    period_month: Option<i32>,
    gross_payroll: i64,
}

impl ImportRow {
    fn into_record(self) -> Result<PayrollImport, sqlx::Error> {
        let period = match (self.period_year, self.period_month) {
            (Some(year), Some(month)) => Some(period_from_db(year, month)?),
            _ => None,
        };
        Ok(PayrollImport {
            mandate_id: MandateId(self.mandate_id),
            import_date: Timestamp::from_utc(self.import_date),
            total_employees: count_from_db(self.total_employees)?,
            period,
            gross_payroll: Cents(self.gross_payroll),
        })
    }
}

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id: Uuid,
    mandate_id: Uuid,
    name: String,
    active: bool,
}
