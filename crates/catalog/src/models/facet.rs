use longbox_archive::Credit;

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct CreditProxy {
    #[facet(rename = "p")]
    person: String,
    #[facet(rename = "r")]
    role: String,
}
impl From<&Credit> for CreditProxy {
    fn from(credit: &Credit) -> Self {
        Self {
            person: credit.person.clone(),
            role: credit.role.clone(),
        }
    }
}
impl From<CreditProxy> for Credit {
    fn from(credit: CreditProxy) -> Self {
        Self::new(credit.person, credit.role)
    }
}
