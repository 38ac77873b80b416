fn main() {
  oura_trends_lib::run()
}
